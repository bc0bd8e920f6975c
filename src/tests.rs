#[cfg(test)]
mod integration_tests {
    use crate::normalize::{clean_dash, normalize_email, normalize_phone, normalize_url, SENTINEL};
    use crate::record::{Field, FieldSet, Record};
    use crate::service::finalize_records;
    use crate::{Config, ScrapeError};
    use std::time::Duration;

    #[test]
    fn config_default_matches_scrape_settings() {
        let config = Config::default();
        assert_eq!(config.workers, 12);
        assert_eq!(config.page_load_timeout, Duration::from_secs(12));
        assert_eq!(config.element_wait_timeout, Duration::from_secs(12));
        assert_eq!(config.http_retries, 2);
        assert!(config.listing_base_url.starts_with("https://"));
        assert!(config.profile_base_url.contains("profil-sekolah"));
    }

    #[test]
    fn error_conversions() {
        let io: ScrapeError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(io, ScrapeError::IoError(_)));

        let json: ScrapeError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(json, ScrapeError::SerializationError(_)));
    }

    #[test]
    fn normalizers_compose_with_clean_dash() {
        // Every normalizer first collapses null-likes to the sentinel.
        for null_like in ["", "-", "—", "0", "N/A"] {
            assert_eq!(normalize_url(null_like), SENTINEL);
            assert_eq!(normalize_email(null_like), SENTINEL);
            assert_eq!(normalize_phone(null_like), SENTINEL);
            assert_eq!(clean_dash(null_like), SENTINEL);
        }
    }

    #[test]
    fn record_json_preserves_field_order() {
        let fields = FieldSet::parse(&["NPSN", "Nama Sekolah", "Email"]).unwrap();
        let mut record = Record::new();
        record.set(Field::NamaSekolah, "SD Negeri Ambarawa 01".into());
        record.set(Field::Npsn, "20320456".into());

        let json = serde_json::to_string(&record.finalized(&fields)).unwrap();
        let npsn_at = json.find("NPSN").unwrap();
        let nama_at = json.find("Nama Sekolah").unwrap();
        let email_at = json.find("Email").unwrap();
        assert!(npsn_at < nama_at && nama_at < email_at);
        assert!(json.contains(r#""Email":"-""#));
    }

    // End-to-end aggregation scenario: three schools, one of them with no
    // reachable profile page, requested fields ["Nama Sekolah", "Email"].
    #[test]
    fn aggregation_keeps_every_school_and_sentinel_fills_gaps() {
        let fields = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();

        let make = |name: &str, email: Option<&str>| {
            let mut record = Record::new();
            record.set(Field::NamaSekolah, name.to_string());
            if let Some(email) = email {
                record.set(Field::Email, email.to_string());
            }
            record
        };

        // Two enriched records and one that degraded to its partial form.
        let records = vec![
            make("SD Kartika", Some("info@kartika.sch.id")),
            make("MI Nurul Huda", Some(SENTINEL)),
            make("SD Pandean", None),
        ];

        let rows = finalize_records(records, &fields);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), fields.len());
            assert!(row.get(Field::Email).is_some());
        }
        assert_eq!(rows[2].get(Field::NamaSekolah), Some("SD Pandean"));
        assert_eq!(rows[2].get(Field::Email), Some(SENTINEL));
    }

    // List-only field sets never need the detail stage at all.
    #[test]
    fn list_only_field_set_skips_enrichment() {
        let fields = FieldSet::parse(&["Nama Sekolah", "NPSN"]).unwrap();
        assert!(!fields.needs_detail());

        let mut a = Record::new();
        a.set(Field::NamaSekolah, "SD B".into());
        a.set(Field::Npsn, "2".into());
        let mut b = Record::new();
        b.set(Field::NamaSekolah, "SD A".into());
        b.set(Field::Npsn, "1".into());

        let rows = finalize_records(vec![a, b], &fields);
        assert_eq!(rows[0].get(Field::NamaSekolah), Some("SD A"));
        assert_eq!(rows[1].get(Field::NamaSekolah), Some("SD B"));
    }
}
