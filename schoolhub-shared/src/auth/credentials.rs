/// Fixed credentials accepted while the auth backend is unavailable
///
/// | email | password | role |
/// |---|---|---|
/// | admin@jollychildren.edu | admin123 | Admin ("Administrator") |
/// | teacher@jollychildren.edu | teacher123 | Teacher ("John Teacher") |
///
/// Anything else is rejected.

use super::AuthUser;
use crate::models::user::UserRole;

#[derive(Debug, Clone)]
struct FallbackAccount {
    email: String,
    password: String,
    user: AuthUser,
}

/// Credential table consulted when backend sign-in fails
#[derive(Debug, Clone)]
pub struct FallbackCredentials {
    accounts: Vec<FallbackAccount>,
}

impl Default for FallbackCredentials {
    fn default() -> Self {
        let mut credentials = FallbackCredentials::empty();
        credentials.add("1", "admin@jollychildren.edu", "admin123", "Administrator", UserRole::Admin);
        credentials.add("2", "teacher@jollychildren.edu", "teacher123", "John Teacher", UserRole::Teacher);
        credentials
    }
}

impl FallbackCredentials {
    /// A table that rejects everything
    pub fn empty() -> Self {
        FallbackCredentials { accounts: Vec::new() }
    }

    pub fn add(&mut self, id: &str, email: &str, password: &str, name: &str, role: UserRole) {
        self.accounts.push(FallbackAccount {
            email: email.to_string(),
            password: password.to_string(),
            user: AuthUser {
                id: id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                role,
                avatar: None,
            },
        });
    }

    /// The matching account, if the pair is in the table
    pub fn check(&self, email: &str, password: &str) -> Option<AuthUser> {
        let email = email.trim();
        self.accounts
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(email) && account.password == password)
            .map(|account| account.user.clone())
    }

    /// Email, password, display name and role of every entry
    pub fn demo_accounts(&self) -> impl Iterator<Item = (&str, &str, &str, UserRole)> {
        self.accounts.iter().map(|account| {
            (
                account.email.as_str(),
                account.password.as_str(),
                account.user.name.as_str(),
                account.user.role,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        let credentials = FallbackCredentials::default();

        let admin = credentials.check("admin@jollychildren.edu", "admin123").unwrap();
        assert_eq!(admin.id, "1");
        assert_eq!(admin.name, "Administrator");

        let teacher = credentials.check("teacher@jollychildren.edu", "teacher123").unwrap();
        assert_eq!(teacher.role, UserRole::Teacher);
        assert_eq!(teacher.name, "John Teacher");
    }

    #[test]
    fn test_wrong_password_or_unknown_email() {
        let credentials = FallbackCredentials::default();
        assert!(credentials.check("admin@jollychildren.edu", "teacher123").is_none());
        assert!(credentials.check("nobody@jollychildren.edu", "admin123").is_none());
        assert!(FallbackCredentials::empty().check("admin@jollychildren.edu", "admin123").is_none());
    }

    #[test]
    fn test_demo_accounts_listed() {
        let credentials = FallbackCredentials::default();
        let emails: Vec<&str> = credentials.demo_accounts().map(|(email, ..)| email).collect();
        assert_eq!(emails, ["admin@jollychildren.edu", "teacher@jollychildren.edu"]);
    }
}
