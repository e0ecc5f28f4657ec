use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub signed_in: bool,
    pub side_menu_open: bool,
}

impl Session {
    pub fn signed_in(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            signed_in: true,
            side_menu_open: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_signed_out() {
        let session = Session::default();

        assert!(!session.signed_in);
        assert!(session.id.is_empty());
    }

    #[test]
    fn signed_in_session_keeps_identity() {
        let session = Session::signed_in("u1", "Alice");

        assert!(session.signed_in);
        assert_eq!(session.id, "u1");
        assert_eq!(session.name, "Alice");
        assert!(!session.side_menu_open);
    }
}
