// ABOUTME: Integration tests for validated domain types.
// ABOUTME: Project names, service names, network aliases and content digests.

use hoist::types::*;

mod project_name_tests {
    use super::*;

    #[test]
    fn lowercases_input() {
        let name = ProjectName::new("Valid-Username").unwrap();
        assert_eq!(name.as_str(), "valid-username");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(ProjectName::new("  app ").unwrap().as_str(), "app");
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(ProjectName::new("   "), Err(ProjectNameError::Empty));
    }

    #[test]
    fn underscores_and_dots_are_rejected() {
        assert!(matches!(
            ProjectName::new("my_app"),
            Err(ProjectNameError::InvalidChar { found: '_', .. })
        ));
        assert!(matches!(
            ProjectName::new("my.app"),
            Err(ProjectNameError::InvalidChar { found: '.', .. })
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let name = ProjectName::new("tests").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""tests""#);
    }
}

mod service_name_tests {
    use super::*;

    #[test]
    fn normalizes_on_construction() {
        let name = ServiceName::normalize("My_Web.App").unwrap();
        assert_eq!(name.as_str(), "my-web-app");
        assert_eq!(name.to_string(), "my-web-app");
    }

    #[test]
    fn all_separator_name_becomes_hyphen() {
        assert_eq!(ServiceName::normalize("__").unwrap().as_str(), "-");
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(ServiceName::normalize(""), Err(ServiceNameError::Empty));
    }

    #[test]
    fn length_is_checked_after_normalization() {
        let raw = format!("{}___", "a".repeat(MAX_SERVICE_NAME_LENGTH - 1));
        let name = ServiceName::normalize(&raw).unwrap();
        assert_eq!(name.as_str().len(), MAX_SERVICE_NAME_LENGTH);

        let raw = "a".repeat(MAX_SERVICE_NAME_LENGTH + 1);
        assert!(matches!(
            ServiceName::normalize(&raw),
            Err(ServiceNameError::TooLong { len, .. }) if len == MAX_SERVICE_NAME_LENGTH + 1
        ));
    }
}

mod network_alias_tests {
    use super::*;

    #[test]
    fn accepts_dns_labels() {
        for alias in ["db", "db-primary", "db_primary", "db.internal"] {
            assert_eq!(NetworkAlias::new(alias).unwrap().as_str(), alias);
        }
    }

    #[test]
    fn rejects_spaces_and_slashes() {
        assert!(matches!(
            NetworkAlias::new("db primary"),
            Err(NetworkAliasError::InvalidChar { found: ' ', .. })
        ));
        assert!(matches!(
            NetworkAlias::new("db/primary"),
            Err(NetworkAliasError::InvalidChar { found: '/', .. })
        ));
    }

    #[test]
    fn empty_is_rejected() {
        assert!(matches!(NetworkAlias::new(" "), Err(NetworkAliasError::Empty)));
    }
}

mod digest_tests {
    use super::*;

    #[test]
    fn empty_input_has_known_digest() {
        let digest = ContentDigest::of(b"");
        assert_eq!(
            digest.as_str(),
            "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn depends_only_on_content() {
        assert_eq!(ContentDigest::of(b"abc"), ContentDigest::of(b"abc"));
        assert_ne!(ContentDigest::of(b"abc"), ContentDigest::of(b"abd"));
    }
}
