//! Integration tests for types

#[cfg(test)]
mod tests {
    use repofetch_types::*;

    #[test]
    fn test_policy_and_solver_parse() {
        assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert_eq!("continue".parse::<FailurePolicy>(), Ok(FailurePolicy::Continue));
        assert!("sometimes".parse::<FailurePolicy>().is_err());

        assert_eq!("command".parse::<SolverKind>(), Ok(SolverKind::Command));
        assert_eq!(SolverKind::default(), SolverKind::Native);
    }

    #[test]
    fn test_policy_serializes_kebab_case() {
        let json = serde_json::to_string(&FailurePolicy::FailFast).unwrap();
        assert_eq!(json, "\"fail-fast\"");
        let policy: FailurePolicy = serde_json::from_str("\"continue\"").unwrap();
        assert_eq!(policy, FailurePolicy::Continue);
    }

    #[test]
    fn test_deb_record_resolves_against_base() {
        let record = PackageRecord::new("bash", "http://deb.debian.org/debian/")
            .with_depends(vec!["libc6".into(), "base-files".into()])
            .with_artifact("/pool/main/b/bash/bash_5.2.15-2+b2_amd64.deb");

        let resolved = record.to_resolved();
        assert_eq!(
            resolved.download_url.as_deref(),
            Some("http://deb.debian.org/debian/pool/main/b/bash/bash_5.2.15-2+b2_amd64.deb")
        );
        assert_eq!(
            resolved.local_filename.as_deref(),
            Some("bash_5.2.15-2+b2_amd64.deb")
        );
        assert_eq!(resolved.evr, None);
        assert_eq!(resolved.to_string(), "bash");
    }

    #[test]
    fn test_final_segment() {
        assert_eq!(final_segment("pool/main/a/app.deb").as_deref(), Some("app.deb"));
        assert_eq!(final_segment("app.deb").as_deref(), Some("app.deb"));
        assert_eq!(final_segment("pool/"), None);
    }

    #[test]
    fn test_delivery_report_round_trips() {
        let mut deliveries = DeliveryReport::default();
        deliveries.skipped.push(SkippedDelivery {
            name: "virtual".into(),
            reason: "no artifact location in repository metadata".into(),
        });
        let json = serde_json::to_string(&deliveries).unwrap();
        let back: DeliveryReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, deliveries);
        assert!(back.is_success());
    }
}
