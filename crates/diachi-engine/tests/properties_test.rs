//! Invariant and law tests from the engine's behavioral contract.

use std::collections::HashMap;
use std::sync::Arc;

use diachi_core::{AdminLevel, EngineConfig, MatchType, ParseRequest, Potential, QualityFlag};
use diachi_db::test_fixtures::TestDatabase;
use diachi_engine::{
    extract_potentials, normalize_hint, normalize_with_alignment, AddressPipeline, ReferenceStore,
};

async fn fixture_store() -> Arc<ReferenceStore> {
    let test_db = TestDatabase::seeded().await;
    let config = EngineConfig::default();
    Arc::new(
        ReferenceStore::load(&test_db.db, config.abbreviation_cache_size)
            .await
            .expect("fixture store"),
    )
}

const SAMPLE_INPUTS: [&str; 6] = [
    "P. Điện Biên, Q. Ba Đình, HN",
    "660/8 PHAM THE HIEN P4 Q8",
    "22 NGO 629 GIAI PHONG HA NOI",
    "14 LO 3A TRUNG YEN 6 KDT TRUNG YEN PHUONG TRUNG HOA CAU GIAY",
    "co nhue1",
    "8 Nguyen Hue Ben Nghe Quan 1 TP HCM",
];

#[test]
fn normalization_is_idempotent_on_every_sample() {
    let empty = HashMap::new();
    for raw in SAMPLE_INPUTS {
        let once = normalize_with_alignment(raw, &empty, None).text();
        let twice = normalize_with_alignment(&once, &empty, None).text();
        assert_eq!(once, twice, "not idempotent for {raw:?}");
    }
}

#[tokio::test]
async fn chosen_ward_always_forms_a_valid_triple() {
    let store = fixture_store().await;
    let pipeline = AddressPipeline::new(Arc::clone(&store), EngineConfig::default());

    for raw in SAMPLE_INPUTS {
        let mut request = ParseRequest::new(raw);
        if raw.contains("PHAM THE HIEN") {
            request = request.with_province_hint("Ho Chi Minh");
        }
        let result = pipeline.parse(&request).await;
        if result.ward.is_none() {
            continue;
        }
        let province = result.province.as_deref().map(normalize_hint);
        let district = result.district.as_deref().map(normalize_hint);
        let ward = result.ward.as_deref().map(normalize_hint);
        assert!(
            store.validate_triple(province.as_deref(), district.as_deref(), ward.as_deref()),
            "result triple for {raw:?} not in hierarchy: {province:?}/{district:?}/{ward:?}"
        );
    }
}

fn assert_non_increasing(list: &[Potential], level: AdminLevel) {
    for pair in list.windows(2) {
        assert!(
            pair[0].adjusted_score >= pair[1].adjusted_score,
            "{level} potentials not sorted: {} < {}",
            pair[0].adjusted_score,
            pair[1].adjusted_score
        );
    }
}

#[tokio::test]
async fn phase2_lists_are_ranked_non_increasing() {
    let store = fixture_store().await;
    let config = EngineConfig::default();

    for raw in SAMPLE_INPUTS {
        let abbrevs = store.abbreviations_in_scope(None, None);
        let normalized = normalize_with_alignment(raw, &abbrevs, None);
        let potentials = extract_potentials(&store, &config, &normalized, None, None);
        assert_non_increasing(&potentials.provinces, AdminLevel::Province);
        assert_non_increasing(&potentials.districts, AdminLevel::District);
        assert_non_increasing(&potentials.wards, AdminLevel::Ward);
        assert_non_increasing(&potentials.streets, AdminLevel::Street);
    }
}

#[tokio::test]
async fn phase_timings_sum_within_total() {
    let pipeline = AddressPipeline::new(fixture_store().await, EngineConfig::default());

    for raw in SAMPLE_INPUTS {
        let result = pipeline.parse(&ParseRequest::new(raw)).await;
        let t = &result.timings;
        let phase_sum =
            t.preprocess_ms + t.extract_ms + t.assemble_ms + t.rank_ms + t.postprocess_ms;
        assert!(
            phase_sum <= t.total_ms + 10.0,
            "phase sum {phase_sum} exceeds total {} for {raw:?}",
            t.total_ms
        );
    }
}

#[tokio::test]
async fn exact_match_implies_ngram_in_input() {
    let store = fixture_store().await;
    let pipeline = AddressPipeline::new(Arc::clone(&store), EngineConfig::default());

    // No hints here: every exact level must literally appear in the
    // normalized input.
    let raw = "dien bien ba dinh ha noi";
    let result = pipeline.parse(&ParseRequest::new(raw)).await;
    assert_eq!(result.match_type, MatchType::Exact);

    let abbrevs = store.abbreviations_in_scope(None, None);
    let normalized = normalize_with_alignment(raw, &abbrevs, None).text();
    for display in [&result.province, &result.district, &result.ward] {
        let name = normalize_hint(display.as_deref().unwrap());
        assert!(
            normalized.contains(&name),
            "{name:?} not present in normalized input {normalized:?}"
        );
    }
}

#[tokio::test]
async fn residual_never_longer_than_input() {
    let pipeline = AddressPipeline::new(fixture_store().await, EngineConfig::default());

    for raw in SAMPLE_INPUTS {
        let result = pipeline.parse(&ParseRequest::new(raw)).await;
        assert!(
            result.remaining_text.len() <= raw.len(),
            "residual longer than input for {raw:?}"
        );
    }
}

#[tokio::test]
async fn round_trip_of_canonical_names_is_exact_with_empty_residual() {
    let pipeline = AddressPipeline::new(fixture_store().await, EngineConfig::default());

    let canonical = "Hà Nội, Ba Đình, Điện Biên";
    let result = pipeline.parse(&ParseRequest::new(canonical)).await;

    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.province.as_deref(), Some("Hà Nội"));
    assert_eq!(result.district.as_deref(), Some("Ba Đình"));
    assert_eq!(result.ward.as_deref(), Some("Điện Biên"));
    assert_eq!(result.remaining_text, "");
    assert_eq!(result.quality_flag, QualityFlag::FullAddress);
}

#[tokio::test]
async fn feeding_a_result_back_reproduces_it() {
    let pipeline = AddressPipeline::new(fixture_store().await, EngineConfig::default());

    let first = pipeline
        .parse(&ParseRequest::new("P. Điện Biên, Q. Ba Đình, HN"))
        .await;
    let rebuilt = format!(
        "{}, {}, {}",
        first.province.as_deref().unwrap(),
        first.district.as_deref().unwrap(),
        first.ward.as_deref().unwrap()
    );

    let second = pipeline.parse(&ParseRequest::new(&rebuilt)).await;
    assert_eq!(second.province, first.province);
    assert_eq!(second.district, first.district);
    assert_eq!(second.ward, first.ward);
    assert_eq!(second.match_type, MatchType::Exact);
    assert_eq!(second.quality_flag, QualityFlag::FullAddress);
}
