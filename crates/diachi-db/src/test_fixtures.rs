//! Test fixtures for database and engine integration tests.
//!
//! Provides an in-memory SQLite database seeded with a miniature but
//! hierarchy-correct slice of the Vietnamese administrative reference
//! data: the provinces, districts, and wards that the end-to-end test
//! scenarios exercise, plus a handful of scoped abbreviations and one
//! migration entry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diachi_db::test_fixtures::TestDatabase;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::seeded().await;
//!     let rows = test_db.db.divisions.load_all().await.unwrap();
//!     assert!(!rows.is_empty());
//! }
//! ```

use sqlx::SqlitePool;

use diachi_core::Result;

use crate::pool::{create_pool_with_config, PoolConfig};
use crate::schema::init_schema;
use crate::Database;

/// In-memory test database.
///
/// The pool is pinned to a single connection: every connection to
/// `sqlite::memory:` gets its own database, so a larger pool would see
/// empty tables.
pub struct TestDatabase {
    pub db: Database,
}

impl TestDatabase {
    /// Create an empty in-memory database with the schema applied.
    pub async fn new() -> Self {
        let pool = create_pool_with_config(
            "sqlite::memory:",
            PoolConfig::new().max_connections(1),
        )
        .await
        .expect("Failed to create in-memory test pool");

        init_schema(&pool).await.expect("Failed to apply schema");

        Self {
            db: Database::new(pool),
        }
    }

    /// Create an in-memory database seeded with the standard fixture.
    pub async fn seeded() -> Self {
        let test_db = Self::new().await;
        seed_standard_fixture(test_db.db.pool())
            .await
            .expect("Failed to seed fixture data");
        test_db
    }
}

/// Insert one hierarchy row.
#[allow(clippy::too_many_arguments)]
pub async fn insert_division(
    pool: &SqlitePool,
    province: (&str, &str, &str, &str, &str),
    district: (&str, &str, &str, &str),
    ward: (&str, &str, &str, &str),
) -> Result<()> {
    let (p_full, p_prefix, p_name, p_norm, p_full_norm) = province;
    let (d_full, d_prefix, d_name, d_norm) = district;
    let (w_full, w_prefix, w_name, w_norm) = ward;

    sqlx::query(
        "INSERT INTO admin_divisions (
            province_full, province_prefix, province_name,
            province_name_normalized, province_full_normalized,
            district_full, district_prefix, district_name, district_name_normalized,
            ward_full, ward_prefix, ward_name, ward_name_normalized
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(p_full)
    .bind(p_prefix)
    .bind(p_name)
    .bind(p_norm)
    .bind(p_full_norm)
    .bind(d_full)
    .bind(d_prefix)
    .bind(d_name)
    .bind(d_norm)
    .bind(w_full)
    .bind(w_prefix)
    .bind(w_name)
    .bind(w_norm)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert one abbreviation row.
pub async fn insert_abbreviation(
    pool: &SqlitePool,
    key: &str,
    word: &str,
    province_context: Option<&str>,
    district_context: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO abbreviations (key, word, province_context, district_context)
         VALUES (?, ?, ?, ?)",
    )
    .bind(key)
    .bind(word)
    .bind(province_context)
    .bind(district_context)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert one migration entry.
#[allow(clippy::too_many_arguments)]
pub async fn insert_migration(
    pool: &SqlitePool,
    old: (&str, &str, &str),
    new: (&str, &str, &str),
) -> Result<()> {
    sqlx::query(
        "INSERT INTO admin_division_migration (
            old_province, old_district, old_ward,
            new_province, new_district, new_ward
        ) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(old.0)
    .bind(old.1)
    .bind(old.2)
    .bind(new.0)
    .bind(new.1)
    .bind(new.2)
    .execute(pool)
    .await?;
    Ok(())
}

/// Seed the standard fixture slice used across the test suites.
pub async fn seed_standard_fixture(pool: &SqlitePool) -> Result<()> {
    let ha_noi = (
        "Thành phố Hà Nội",
        "Thành phố",
        "Hà Nội",
        "ha noi",
        "thanh pho ha noi",
    );
    let ho_chi_minh = (
        "Thành phố Hồ Chí Minh",
        "Thành phố",
        "Hồ Chí Minh",
        "ho chi minh",
        "thanh pho ho chi minh",
    );
    let tuyen_quang = (
        "Tỉnh Tuyên Quang",
        "Tỉnh",
        "Tuyên Quang",
        "tuyen quang",
        "tinh tuyen quang",
    );
    let quang_ninh = (
        "Tỉnh Quảng Ninh",
        "Tỉnh",
        "Quảng Ninh",
        "quang ninh",
        "tinh quang ninh",
    );

    // Hà Nội
    let ba_dinh = ("Quận Ba Đình", "Quận", "Ba Đình", "ba dinh");
    for ward in [
        ("Phường Điện Biên", "Phường", "Điện Biên", "dien bien"),
        ("Phường Kim Mã", "Phường", "Kim Mã", "kim ma"),
        ("Phường Ngọc Hà", "Phường", "Ngọc Hà", "ngoc ha"),
    ] {
        insert_division(pool, ha_noi, ba_dinh, ward).await?;
    }

    let cau_giay = ("Quận Cầu Giấy", "Quận", "Cầu Giấy", "cau giay");
    for ward in [
        ("Phường Trung Hòa", "Phường", "Trung Hòa", "trung hoa"),
        ("Phường Yên Hòa", "Phường", "Yên Hòa", "yen hoa"),
        ("Phường Dịch Vọng", "Phường", "Dịch Vọng", "dich vong"),
    ] {
        insert_division(pool, ha_noi, cau_giay, ward).await?;
    }

    let hai_ba_trung = ("Quận Hai Bà Trưng", "Quận", "Hai Bà Trưng", "hai ba trung");
    insert_division(
        pool,
        ha_noi,
        hai_ba_trung,
        ("Phường Bách Khoa", "Phường", "Bách Khoa", "bach khoa"),
    )
    .await?;

    let bac_tu_liem = ("Quận Bắc Từ Liêm", "Quận", "Bắc Từ Liêm", "bac tu liem");
    for ward in [
        ("Phường Cổ Nhuế 1", "Phường", "Cổ Nhuế 1", "co nhue 1"),
        ("Phường Cổ Nhuế 2", "Phường", "Cổ Nhuế 2", "co nhue 2"),
    ] {
        insert_division(pool, ha_noi, bac_tu_liem, ward).await?;
    }

    let hoang_mai = ("Quận Hoàng Mai", "Quận", "Hoàng Mai", "hoang mai");
    insert_division(
        pool,
        ha_noi,
        hoang_mai,
        ("Phường Giáp Bát", "Phường", "Giáp Bát", "giap bat"),
    )
    .await?;

    let ha_dong = ("Quận Hà Đông", "Quận", "Hà Đông", "ha dong");
    insert_division(
        pool,
        ha_noi,
        ha_dong,
        ("Phường Văn Quán", "Phường", "Văn Quán", "van quan"),
    )
    .await?;

    // Hồ Chí Minh
    let quan_1 = ("Quận 1", "Quận", "1", "1");
    for ward in [
        ("Phường Bến Nghé", "Phường", "Bến Nghé", "ben nghe"),
        ("Phường Bến Thành", "Phường", "Bến Thành", "ben thanh"),
    ] {
        insert_division(pool, ho_chi_minh, quan_1, ward).await?;
    }

    let quan_3 = ("Quận 3", "Quận", "3", "3");
    insert_division(pool, ho_chi_minh, quan_3, ("Phường 1", "Phường", "1", "1")).await?;

    let quan_8 = ("Quận 8", "Quận", "8", "8");
    for ward in [
        ("Phường 4", "Phường", "4", "4"),
        ("Phường 5", "Phường", "5", "5"),
    ] {
        insert_division(pool, ho_chi_minh, quan_8, ward).await?;
    }

    let tan_binh = ("Quận Tân Bình", "Quận", "Tân Bình", "tan binh");
    insert_division(pool, ho_chi_minh, tan_binh, ("Phường 2", "Phường", "2", "2")).await?;

    // Tuyên Quang — holds the "trung yen" ward that must NOT win over
    // "trung hoa" when the input names Cầu Giấy.
    let son_duong = ("Huyện Sơn Dương", "Huyện", "Sơn Dương", "son duong");
    insert_division(
        pool,
        tuyen_quang,
        son_duong,
        ("Xã Trung Yên", "Xã", "Trung Yên", "trung yen"),
    )
    .await?;

    // Quảng Ninh
    let ha_long = ("Thành phố Hạ Long", "Thành phố", "Hạ Long", "ha long");
    for ward in [
        ("Phường Hồng Hải", "Phường", "Hồng Hải", "hong hai"),
        ("Phường Hồng Gai", "Phường", "Hồng Gai", "hong gai"),
    ] {
        insert_division(pool, quang_ninh, ha_long, ward).await?;
    }

    // Abbreviations: global, province-scoped, district-scoped.
    insert_abbreviation(pool, "hn", "ha noi", None, None).await?;
    insert_abbreviation(pool, "hcm", "ho chi minh", None, None).await?;
    insert_abbreviation(pool, "brvt", "ba ria vung tau", None, None).await?;
    insert_abbreviation(pool, "hbt", "hai ba trung", Some("ha noi"), None).await?;
    insert_abbreviation(pool, "tphl", "ha long", Some("quang ninh"), None).await?;
    insert_abbreviation(pool, "bk", "bach khoa", Some("ha noi"), Some("hai ba trung")).await?;

    // Hà Tây was merged into Hà Nội; the old triple must rewrite.
    insert_migration(
        pool,
        ("ha tay", "ha dong", "van quan"),
        ("ha noi", "ha dong", "van quan"),
    )
    .await?;

    Ok(())
}
