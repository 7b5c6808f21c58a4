//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Credentials are stored in `Zeroizing<T>` containers
//! - Memory is cleared when credentials go out of scope
//! - Passwords are never exposed in debug output or logs

use zeroize::{Zeroize, Zeroizing};

/// Username and optional password, zeroed on drop.
///
/// # Example
///
/// ```rust
/// use pocketdoc_core::security::Credentials;
///
/// let creds = Credentials::new("hr".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "hr");
/// assert_eq!(creds.password(), Some("secret"));
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username (still protected by Zeroizing).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password for handing to a driver. Never log the returned value.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Replaces the password, zeroing the previous one.
    pub fn set_password(&mut self, password: Option<String>) {
        self.password = Zeroizing::new(password);
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = Credentials::new("testuser".to_string(), Some("testpass".to_string()));
        assert_eq!(creds.username(), "testuser");
        assert!(creds.has_password());
        assert_eq!(creds.password(), Some("testpass"));
    }

    #[test]
    fn test_credentials_no_password() {
        let creds = Credentials::new("testuser".to_string(), None);
        assert!(!creds.has_password());
        assert_eq!(creds.password(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("scott".to_string(), Some("tiger".to_string()));
        let debug = format!("{:?}", creds);
        assert!(debug.contains("scott"));
        assert!(debug.contains("****"));
        assert!(!debug.contains("tiger"));
    }

    #[test]
    fn test_set_password_replaces_value() {
        let mut creds = Credentials::new("u".to_string(), None);
        creds.set_password(Some("p".to_string()));
        assert_eq!(creds.password(), Some("p"));
        let clone = creds.clone();
        assert_eq!(clone.password(), Some("p"));
    }
}
