//! Candidate assembly behavior over the fixture hierarchy.

use std::sync::Arc;

use diachi_core::{
    AdminLevel, CandidateSource, EngineConfig, Potential, PotentialSource, Span,
};
use diachi_db::test_fixtures::TestDatabase;
use diachi_engine::{assemble_candidates, Potentials, ReferenceStore};

async fn fixture_store() -> Arc<ReferenceStore> {
    let test_db = TestDatabase::seeded().await;
    let config = EngineConfig::default();
    Arc::new(
        ReferenceStore::load(&test_db.db, config.abbreviation_cache_size)
            .await
            .expect("fixture store"),
    )
}

fn pot(level: AdminLevel, name: &str, score: f64, span: (usize, usize)) -> Potential {
    Potential {
        level,
        canonical_name: name.to_string(),
        span: Span::new(span.0, span.1),
        raw_score: score,
        adjusted_score: score,
        source: PotentialSource::Exact,
        keyword_context: false,
    }
}

#[tokio::test]
async fn numeric_ward_ties_within_band_are_retained() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    let potentials = Potentials {
        provinces: vec![pot(AdminLevel::Province, "ho chi minh", 1.0, (4, 7))],
        districts: vec![pot(AdminLevel::District, "8", 1.0, (3, 4))],
        wards: vec![
            pot(AdminLevel::Ward, "4", 0.98, (1, 2)),
            pot(AdminLevel::Ward, "5", 0.95, (2, 3)),
        ],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    let ward_4 = outcome
        .candidates
        .iter()
        .find(|c| c.ward.as_deref() == Some("4"))
        .expect("ward 4 candidate");
    let ward_5 = outcome
        .candidates
        .iter()
        .find(|c| c.ward.as_deref() == Some("5"))
        .expect("ward 5 candidate retained");

    assert_eq!(ward_4.source, CandidateSource::Local);
    // Within the 0.05 band of the best numeric ward: kept for the ranker,
    // marked as a disambiguation alternative.
    assert_eq!(ward_5.source, CandidateSource::Disambiguation);
}

#[tokio::test]
async fn numeric_ward_outside_band_is_plain_local() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    let potentials = Potentials {
        provinces: vec![pot(AdminLevel::Province, "ho chi minh", 1.0, (4, 7))],
        districts: vec![pot(AdminLevel::District, "8", 1.0, (3, 4))],
        wards: vec![
            pot(AdminLevel::Ward, "4", 1.0, (1, 2)),
            pot(AdminLevel::Ward, "5", 0.85, (2, 3)),
        ],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    let ward_5 = outcome
        .candidates
        .iter()
        .find(|c| c.ward.as_deref() == Some("5"))
        .expect("ward 5 candidate");
    assert_eq!(ward_5.source, CandidateSource::Local);
}

#[tokio::test]
async fn legacy_triple_rewritten_before_validation() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    // "ha tay / ha dong / van quan" no longer exists; the migration map
    // carries it to Hà Nội. Without the rewrite this combination would be
    // pruned as an invalid hierarchy.
    let potentials = Potentials {
        provinces: vec![pot(AdminLevel::Province, "ha tay", 1.0, (2, 4))],
        districts: vec![pot(AdminLevel::District, "ha dong", 1.0, (1, 2))],
        wards: vec![pot(AdminLevel::Ward, "van quan", 1.0, (0, 1))],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    let rewritten = outcome
        .candidates
        .iter()
        .find(|c| c.ward.as_deref() == Some("van quan") && c.province.as_deref() == Some("ha noi"))
        .expect("rewritten candidate");
    assert!(rewritten.hierarchy_valid);
    assert!(!outcome
        .candidates
        .iter()
        .any(|c| c.province.as_deref() == Some("ha tay")));
}

#[tokio::test]
async fn ward_only_potential_pulls_unique_parents() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    let potentials = Potentials {
        provinces: Vec::new(),
        districts: Vec::new(),
        wards: vec![pot(AdminLevel::Ward, "dien bien", 1.0, (0, 2))],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    let full = outcome
        .candidates
        .iter()
        .find(|c| c.ward.as_deref() == Some("dien bien"))
        .expect("inferred candidate");
    assert_eq!(full.province.as_deref(), Some("ha noi"));
    assert_eq!(full.district.as_deref(), Some("ba dinh"));
    assert_eq!(full.at_rule(), 3);
}

#[tokio::test]
async fn impossible_combinations_are_pruned() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    // "ben nghe" belongs to Hồ Chí Minh; combined with Hà Nội it must
    // never survive.
    let potentials = Potentials {
        provinces: vec![pot(AdminLevel::Province, "ha noi", 1.0, (2, 4))],
        districts: Vec::new(),
        wards: vec![pot(AdminLevel::Ward, "ben nghe", 1.0, (0, 2))],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    assert!(!outcome.candidates.iter().any(|c| {
        c.province.as_deref() == Some("ha noi") && c.ward.as_deref() == Some("ben nghe")
    }));
    // The ward-only interpretation still resolves through its real parents.
    assert!(outcome.candidates.iter().any(|c| {
        c.province.as_deref() == Some("ho chi minh") && c.ward.as_deref() == Some("ben nghe")
    }));
}

#[tokio::test]
async fn display_names_attached_from_store() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    let potentials = Potentials {
        provinces: vec![pot(AdminLevel::Province, "ho chi minh", 1.0, (3, 6))],
        districts: vec![pot(AdminLevel::District, "8", 1.0, (2, 3))],
        wards: vec![pot(AdminLevel::Ward, "4", 1.0, (1, 2))],
        streets: Vec::new(),
    };

    let outcome =
        assemble_candidates(&store, &config, &potentials, None, None, "", None).await;

    let best = outcome
        .candidates
        .iter()
        .find(|c| c.at_rule() == 3)
        .expect("full candidate");
    assert_eq!(best.province_display.as_deref(), Some("Hồ Chí Minh"));
    assert_eq!(best.district_display.as_deref(), Some("Quận 8"));
    assert_eq!(best.ward_display.as_deref(), Some("Phường 4"));
}
