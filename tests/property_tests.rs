//! Property tests: arbitrary sequences of upserts against one entry.

use catalog_sync::store::MemoryStore;
use catalog_sync::{Catalog, CatalogOptions, Locale, NewTranslation, TranslationPatch, TranslationRow};
use proptest::prelude::*;
use std::collections::HashMap;

const TRANSLATED: [&str; 4] = ["fr", "de", "es", "it"];

#[derive(Debug, Clone)]
enum Step {
    Canonical {
        icon: Option<u8>,
        image: Option<u8>,
        title: Option<u8>,
        visible: Option<bool>,
        primary_label: Option<u8>,
    },
    Translate {
        locale: usize,
        primary_label: Option<u8>,
        secondary_label: Option<u8>,
        // Shared fields sent with a non-canonical write must be ignored.
        icon: Option<u8>,
    },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (
            proptest::option::of(0u8..4),
            proptest::option::of(0u8..4),
            proptest::option::of(0u8..4),
            proptest::option::of(any::<bool>()),
            proptest::option::of(0u8..4),
        )
            .prop_map(|(icon, image, title, visible, primary_label)| Step::Canonical {
                icon,
                image,
                title,
                visible,
                primary_label,
            }),
        (
            0..TRANSLATED.len(),
            proptest::option::of(0u8..4),
            proptest::option::of(0u8..4),
            proptest::option::of(0u8..4),
        )
            .prop_map(|(locale, primary_label, secondary_label, icon)| Step::Translate {
                locale,
                primary_label,
                secondary_label,
                icon,
            }),
    ]
}

fn text(prefix: &str, n: u8) -> String {
    format!("{}-{}", prefix, n)
}

fn seed(catalog: &Catalog<MemoryStore>) -> TranslationRow {
    tokio_test::block_on(catalog.create_canonical(NewTranslation {
        icon: Some("icon-start".to_string()),
        image: Some("image-start".to_string()),
        primary_label: Some("Admin View".to_string()),
        secondary_label: Some("Partner View".to_string()),
        ..Default::default()
    }))
    .expect("seed canonical row")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of successful upserts every row of the entry
    /// carries the canonical row's shared fields, and each translation keeps
    /// exactly the labels last written for its own locale.
    #[test]
    fn prop_upserts_keep_group_consistent(steps in proptest::collection::vec(step(), 1..16)) {
        let catalog = Catalog::new(MemoryStore::new(), CatalogOptions::default());
        let en = seed(&catalog);
        let mut labels: HashMap<&str, (String, String)> = HashMap::new();

        for step in steps {
            match step {
                Step::Canonical { icon, image, title, visible, primary_label } => {
                    let patch = TranslationPatch {
                        icon: icon.map(|n| text("icon", n)),
                        image: image.map(|n| text("image", n)),
                        title: title.map(|n| text("title", n)),
                        visible,
                        primary_label: primary_label.map(|n| text("label", n)),
                        ..Default::default()
                    };
                    tokio_test::block_on(catalog.upsert(en.id, Locale::CANONICAL, patch))
                        .expect("canonical upsert");
                }
                Step::Translate { locale, primary_label, secondary_label, icon } => {
                    let code = TRANSLATED[locale];
                    let entry = labels
                        .entry(code)
                        .or_insert_with(|| (format!("{} primary", code), format!("{} secondary", code)));
                    let exists = catalog.store().rows().iter().any(|r| r.locale == code);
                    // A new translation needs both labels.
                    let patch = if exists {
                        if let Some(n) = primary_label {
                            entry.0 = text(code, n);
                        }
                        if let Some(n) = secondary_label {
                            entry.1 = text(code, n);
                        }
                        TranslationPatch {
                            primary_label: primary_label.map(|n| text(code, n)),
                            secondary_label: secondary_label.map(|n| text(code, n)),
                            icon: icon.map(|n| text("rogue", n)),
                            ..Default::default()
                        }
                    } else {
                        TranslationPatch {
                            primary_label: Some(entry.0.clone()),
                            secondary_label: Some(entry.1.clone()),
                            icon: icon.map(|n| text("rogue", n)),
                            ..Default::default()
                        }
                    };
                    let locale = Locale::from_code(code).expect("supported locale");
                    tokio_test::block_on(catalog.upsert(en.id, locale, patch))
                        .expect("translation upsert");
                }
            }
        }

        let rows = catalog.store().rows();
        let canonical = rows.iter().find(|r| r.id == en.id).expect("canonical row kept");
        for row in &rows {
            prop_assert_eq!(row.shared(), canonical.shared());
            prop_assert!(!row.icon.starts_with("rogue"));
            if let Some((primary, secondary)) = labels.get(row.locale.as_str()) {
                prop_assert_eq!(&row.primary_label, primary);
                prop_assert_eq!(&row.secondary_label, secondary);
            }
        }
        prop_assert_eq!(rows.len(), 1 + labels.len());
    }

    /// An upsert that carries no fields returns the stored row unchanged.
    #[test]
    fn prop_empty_upsert_is_identity(locale in 0..TRANSLATED.len(), canonical in any::<bool>()) {
        let catalog = Catalog::new(MemoryStore::new(), CatalogOptions::default());
        let en = seed(&catalog);
        let code = TRANSLATED[locale];
        let translated = tokio_test::block_on(catalog.upsert(
            en.id,
            Locale::from_code(code).expect("supported locale"),
            TranslationPatch {
                primary_label: Some("primary".to_string()),
                secondary_label: Some("secondary".to_string()),
                ..Default::default()
            },
        ))
        .expect("create translation")
        .row;

        let (target, locale) = if canonical {
            (en.clone(), Locale::CANONICAL)
        } else {
            (translated, Locale::from_code(code).expect("supported locale"))
        };
        let before = catalog.store().rows();
        let upserted = tokio_test::block_on(catalog.upsert(target.id, locale, TranslationPatch::default()))
            .expect("empty upsert");

        prop_assert_eq!(upserted.row, target);
        prop_assert_eq!(catalog.store().rows(), before);
    }
}
