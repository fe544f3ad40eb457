//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose wardrobe use-cases (add, list, wear, wash) to Dart via FRB.
//! - Flatten core errors into envelopes with a stable `error_code`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - `owner_id` is whatever the app's identity provider returned; `None` or
//!   blank means the user is signed out.
//! - Event timestamps are taken from this process's clock at call time.

use chrono::{DateTime, Utc};
use log::warn;
use std::sync::OnceLock;
use uuid::Uuid;
use wearlog_core::db::open_db;
use wearlog_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreConfig, DayBoundaryZone, DerivedState, GarmentId, GarmentSummary, Identity, LedgerEngine,
    NewGarment, SqliteEventStore, SqliteGarmentRepository, WardrobeError, WardrobeService,
};

static CONFIG: OnceLock<Result<CoreConfig, String>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One garment card for the wardrobe screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardrobeItem {
    pub garment_id: String,
    pub name: String,
    pub image_ref: String,
    pub size: Option<String>,
    /// Epoch milliseconds of the latest wash, if any.
    pub last_wash_at_ms: Option<i64>,
    /// Calendar date (`YYYY-MM-DD`) of the latest wash in the day zone.
    pub last_wash_date: Option<String>,
    pub wears_since_last_wash: u32,
    /// Whether a wear can still be logged today.
    pub can_wear: bool,
    /// Whether a wash can still be logged today.
    pub can_wash: bool,
}

/// Response envelope for the wardrobe list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardrobeListResponse {
    pub ok: bool,
    pub items: Vec<WardrobeItem>,
    /// Empty on success; one of `unauthenticated|store_unavailable|internal`.
    pub error_code: String,
    pub message: String,
}

/// Response envelope for garment and ledger writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardrobeActionResponse {
    pub ok: bool,
    pub garment_id: Option<String>,
    pub wears_since_last_wash: Option<u32>,
    pub last_wash_at_ms: Option<i64>,
    /// Empty on success; `duplicate_today` is a normal user-facing rejection.
    pub error_code: String,
    pub message: String,
}

impl WardrobeActionResponse {
    fn created(garment_id: GarmentId) -> Self {
        Self {
            ok: true,
            garment_id: Some(garment_id.to_string()),
            wears_since_last_wash: None,
            last_wash_at_ms: None,
            error_code: String::new(),
            message: "Garment added.".to_string(),
        }
    }

    fn logged(garment_id: GarmentId, state: DerivedState, message: &str) -> Self {
        Self {
            ok: true,
            garment_id: Some(garment_id.to_string()),
            wears_since_last_wash: Some(state.wears_since_last_wash),
            last_wash_at_ms: state.last_wash_at.map(|at| at.timestamp_millis()),
            error_code: String::new(),
            message: message.to_string(),
        }
    }

    fn failure(failure: Failure) -> Self {
        Self {
            ok: false,
            garment_id: None,
            wears_since_last_wash: None,
            last_wash_at_ms: None,
            error_code: failure.code.to_string(),
            message: failure.message,
        }
    }
}

/// Adds a garment for the signed-in owner.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `image_ref` is the content-store address returned by the upload step.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn garment_add(
    owner_id: Option<String>,
    name: String,
    image_ref: String,
    size: Option<String>,
) -> WardrobeActionResponse {
    let identity = Identity::from_raw(owner_id.as_deref());
    let input = NewGarment {
        name,
        image_ref,
        size: size.filter(|value| !value.trim().is_empty()),
    };
    match with_wardrobe(|wardrobe| wardrobe.add_garment(&identity, input, Utc::now())) {
        Ok(garment) => WardrobeActionResponse::created(garment.id),
        Err(failure) => WardrobeActionResponse::failure(failure),
    }
}

/// Lists the owner's garments with wear counts and today's eligibility.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn wardrobe_list(owner_id: Option<String>) -> WardrobeListResponse {
    let identity = Identity::from_raw(owner_id.as_deref());
    let result = with_wardrobe(|wardrobe| {
        let zone = wardrobe.ledger().zone();
        let summaries = wardrobe.list_wardrobe(&identity, Utc::now())?;
        Ok(summaries
            .into_iter()
            .map(|summary| to_wardrobe_item(summary, zone))
            .collect::<Vec<_>>())
    });

    match result {
        Ok(items) => {
            let message = if items.is_empty() {
                "No garments found.".to_string()
            } else {
                format!("Found {} garment(s).", items.len())
            };
            WardrobeListResponse {
                ok: true,
                items,
                error_code: String::new(),
                message,
            }
        }
        Err(failure) => WardrobeListResponse {
            ok: false,
            items: Vec::new(),
            error_code: failure.code.to_string(),
            message: failure.message,
        },
    }
}

/// Logs that the garment was worn now.
///
/// # FFI contract
/// - At most one wear per garment per calendar day; a second call the same
///   day returns `error_code = "duplicate_today"` and writes nothing.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn garment_log_wear(owner_id: Option<String>, garment_id: String) -> WardrobeActionResponse {
    log_now(owner_id, garment_id, |wardrobe, identity, id, now| {
        wardrobe.log_wear(identity, id, now)
    })
    .unwrap_or_else(WardrobeActionResponse::failure)
}

/// Logs that the garment was washed now; resets the wear count.
///
/// # FFI contract
/// - At most one wash per garment per calendar day.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn garment_log_wash(owner_id: Option<String>, garment_id: String) -> WardrobeActionResponse {
    log_now(owner_id, garment_id, |wardrobe, identity, id, now| {
        wardrobe.log_wash(identity, id, now)
    })
    .unwrap_or_else(WardrobeActionResponse::failure)
}

type SqliteWardrobe<'conn> =
    WardrobeService<SqliteGarmentRepository<'conn>, SqliteEventStore<'conn>>;

struct Failure {
    code: &'static str,
    message: String,
}

impl From<WardrobeError> for Failure {
    fn from(err: WardrobeError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

fn log_now(
    owner_id: Option<String>,
    garment_id: String,
    log: impl FnOnce(
        &SqliteWardrobe<'_>,
        &Identity,
        GarmentId,
        DateTime<Utc>,
    ) -> Result<DerivedState, WardrobeError>,
) -> Result<WardrobeActionResponse, Failure> {
    let identity = Identity::from_raw(owner_id.as_deref());
    let id = Uuid::parse_str(garment_id.trim()).map_err(|_| Failure {
        code: "invalid_input",
        message: format!("invalid garment id `{}`", garment_id.trim()),
    })?;
    let state = with_wardrobe(|wardrobe| log(wardrobe, &identity, id, Utc::now()))?;
    Ok(WardrobeActionResponse::logged(id, state, "Logged."))
}

fn resolve_config() -> Result<&'static CoreConfig, Failure> {
    CONFIG
        .get_or_init(|| CoreConfig::from_env().map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|message| Failure {
            code: "invalid_config",
            message: message.clone(),
        })
}

fn with_wardrobe<T>(
    f: impl FnOnce(&SqliteWardrobe<'_>) -> Result<T, WardrobeError>,
) -> Result<T, Failure> {
    let config = resolve_config()?;
    let conn = open_db(&config.db_path).map_err(|err| {
        warn!("event=ffi_db_open module=ffi status=error error={err}");
        Failure {
            code: "store_unavailable",
            message: format!("wardrobe DB open failed: {err}"),
        }
    })?;
    let garments = SqliteGarmentRepository::try_new(&conn).map_err(|err| Failure {
        code: "internal",
        message: format!("garment registry init failed: {err}"),
    })?;
    let store = SqliteEventStore::try_new(&conn).map_err(|err| Failure {
        code: "internal",
        message: format!("event store init failed: {err}"),
    })?;
    let wardrobe = WardrobeService::new(garments, LedgerEngine::new(store, config.day_zone));
    f(&wardrobe).map_err(Failure::from)
}

fn to_wardrobe_item(summary: GarmentSummary, zone: DayBoundaryZone) -> WardrobeItem {
    let GarmentSummary {
        garment,
        state,
        today,
    } = summary;
    WardrobeItem {
        garment_id: garment.id.to_string(),
        name: garment.name,
        image_ref: garment.image_ref,
        size: garment.size,
        last_wash_at_ms: state.last_wash_at.map(|at| at.timestamp_millis()),
        last_wash_date: state
            .last_wash_at
            .map(|at| zone.date_of(at).format("%Y-%m-%d").to_string()),
        wears_since_last_wash: state.wears_since_last_wash,
        can_wear: today.can_wear,
        can_wash: today.can_wash,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, garment_add, garment_log_wash, garment_log_wear, init_logging, ping,
        resolve_config, wardrobe_list,
    };
    use chrono::{DateTime, NaiveDate, Utc};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn signed_out_calls_are_rejected() {
        let response = wardrobe_list(None);
        assert!(!response.ok);
        assert_eq!(response.error_code, "unauthenticated");

        let add = garment_add(Some("  ".to_string()), "Jeans".into(), "img".into(), None);
        assert!(!add.ok);
        assert_eq!(add.error_code, "unauthenticated");
    }

    #[test]
    fn add_wear_wash_flow_updates_wardrobe_item() {
        let owner = Some(unique_token("owner"));
        let created = garment_add(
            owner.clone(),
            "Jeans".to_string(),
            "pants-images/jeans.jpg".to_string(),
            Some(" ".to_string()),
        );
        assert!(created.ok, "{}", created.message);
        let garment_id = created.garment_id.expect("created garment id");

        let listed = wardrobe_list(owner.clone());
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].size, None);
        assert!(listed.items[0].can_wear);

        // Gate assertions only hold if every call lands on the same day.
        let day_before = current_day();
        let worn = garment_log_wear(owner.clone(), garment_id.clone());
        let again = garment_log_wear(owner.clone(), garment_id.clone());
        let washed = garment_log_wash(owner.clone(), garment_id.clone());
        let item = wardrobe_list(owner).items[0].clone();
        let crossed_midnight = current_day() != day_before;

        assert!(worn.ok, "{}", worn.message);
        assert_eq!(worn.wears_since_last_wash, Some(1));
        assert!(washed.ok, "{}", washed.message);
        assert_eq!(washed.wears_since_last_wash, Some(0));

        let last_wash_ms = washed.last_wash_at_ms.expect("wash timestamp");
        assert_eq!(item.last_wash_at_ms, Some(last_wash_ms));
        let expected_date = resolve_config().ok().map(|config| {
            let washed_at = DateTime::<Utc>::from_timestamp_millis(last_wash_ms).unwrap();
            config.day_zone.date_of(washed_at).format("%Y-%m-%d").to_string()
        });
        assert_eq!(item.last_wash_date, expected_date);

        if crossed_midnight {
            return;
        }
        assert!(!again.ok);
        assert_eq!(again.error_code, "duplicate_today");
        assert!(!item.can_wear);
        assert!(!item.can_wash);
    }

    #[test]
    fn other_owners_cannot_log_on_a_garment() {
        let created = garment_add(
            Some(unique_token("alice")),
            "Chinos".to_string(),
            "pants-images/chinos.jpg".to_string(),
            None,
        );
        let garment_id = created.garment_id.expect("created garment id");

        let response = garment_log_wear(Some(unique_token("bob")), garment_id);
        assert!(!response.ok);
        assert_eq!(response.error_code, "not_found");
    }

    #[test]
    fn malformed_garment_id_is_invalid_input() {
        let response = garment_log_wash(Some("uid".to_string()), "not-a-uuid".to_string());
        assert_eq!(response.error_code, "invalid_input");
    }

    fn current_day() -> Option<NaiveDate> {
        resolve_config()
            .ok()
            .map(|config| config.day_zone.date_of(Utc::now()))
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
