use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    models::{Role, User},
};

/// Which kind of login a session file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Admin,
    Photographer,
}

impl SessionKind {
    fn file_name(&self) -> &'static str {
        match self {
            SessionKind::Admin => "admin-session.json",
            SessionKind::Photographer => "photographer-session.json",
        }
    }

    /// Roles allowed to hold this kind of session.
    pub fn permits(&self, role: &Role) -> bool {
        match self {
            SessionKind::Admin => *role == Role::Admin,
            SessionKind::Photographer => matches!(role, Role::Photographer | Role::Admin),
        }
    }

    pub fn denied_message(&self) -> &'static str {
        match self {
            SessionKind::Admin => "Access denied. Admin privileges required.",
            SessionKind::Photographer => "Access denied. Photographer account required.",
        }
    }
}

/// Logged in user record kept on disk between invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    kind: SessionKind,
}

impl SessionStore {
    pub fn new(config_dir: &Path, kind: SessionKind) -> Self {
        Self {
            path: config_dir.join(kind.file_name()),
            kind,
        }
    }

    pub fn load(&self) -> Result<Option<User>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The stored user, or an error telling the caller to log in first.
    pub fn require(&self) -> Result<User> {
        self.load()?
            .ok_or_else(|| Error::Session("Not logged in. Run `login` first.".into()))
    }

    /// Persist `user` after checking its role fits this session kind.
    pub fn save(&self, user: &User) -> Result<()> {
        if !self.kind.permits(&user.role) {
            return Err(Error::Session(self.kind.denied_message().into()));
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(user)?)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), user = %user.username, "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            username: "sam".into(),
            active: true,
            role,
            created_at: None,
        }
    }

    #[test]
    fn round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path(), SessionKind::Photographer);
        assert!(store.load().unwrap().is_none());
        assert!(matches!(store.require(), Err(Error::Session(_))));

        store.save(&user(Role::Photographer)).unwrap();
        assert_eq!(store.require().unwrap().username, "sam");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn admin_session_requires_admin_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path(), SessionKind::Admin);
        let err = store.save(&user(Role::Photographer)).unwrap_err();
        assert_eq!(err.to_string(), "Access denied. Admin privileges required.");
        assert!(store.load().unwrap().is_none());

        store.save(&user(Role::Admin)).unwrap();
        assert!(store.load().unwrap().is_some());
    }
}
