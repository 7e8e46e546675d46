//! Protocol constants and tunables

/// URI of the well-known default calendar every user owns.
pub const DEFAULT_CALENDAR_URI: &str = "events";

/// Display name the default calendar is always listed under.
pub const DEFAULT_CALENDAR_NAME: &str = "Events";

/// How many conditional PUTs a participation update may attempt before
/// giving up on a contended event. Tunable; the value itself is not derived
/// from anything.
pub const MAX_WRITE_ATTEMPTS: u32 = 12;

/// In-app location the browser is redirected to after a successful
/// participation change.
pub const CALENDAR_UI_PATH: &str = "/#/calendar";

/// Header carrying the caller's access token on every DAV request.
pub const TOKEN_HEADER: &str = "ESNToken";

/// Mail template rendered by the alarm notification dispatch.
pub const ALARM_EMAIL_TEMPLATE: &str = "event.alarm";
