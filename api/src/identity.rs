//! Identity collaborator: who is operating the console.
//!
//! Token issuance happens elsewhere; the console only carries the issued
//! token and the user it belongs to, and uses them to gate the live view.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Identity {
    token: Option<String>,
    user: Option<User>,
}

impl Identity {
    pub fn new(token: Option<String>, user: Option<User>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token, user }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref().filter(|_| self.is_authenticated())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
