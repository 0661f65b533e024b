//! Small pure helpers shared by the event appliers and services.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Oslo;
use innsyn_sdk::{DigisosSak, JsonFilreferanse};
use regex::Regex;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;

use crate::domain::error::DomainError;

const COUNTER_SUFFIX_LENGTH: usize = 4;

/// Length of `-<8 hex chars>` appended to uploaded filenames.
pub const LENGTH_OF_UUID_PART: usize = 9;

#[allow(clippy::expect_used)]
static FNR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{11}\b").expect("static regex should not panic"));

#[allow(clippy::expect_used)]
static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[^a-z\u{e6}\u{f8}\u{e5}A-Z\u{c6}\u{d8}\u{c5}0-9 (),._\u{2013}-]")
        .expect("static regex should not panic")
});

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[must_use]
pub fn sha512_hex(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

/// Replaces every standalone 11-digit number with `[FNR]`.
#[must_use]
pub fn mask_fnr(message: &str) -> String {
    FNR.replace_all(message, "[FNR]").into_owned()
}

/// Next `navEksternRefId` for an upload on `sak`.
///
/// Continues the highest counter among earlier ettersendelser. Without any,
/// the counter starts at `0001` on the original application's id, or on the
/// digisos id for paper applications.
#[must_use]
pub fn lag_nav_ekstern_ref_id(sak: &DigisosSak) -> String {
    let previous = sak
        .ettersendelser()
        .iter()
        .map(|e| e.nav_ekstern_ref_id.as_str())
        .max_by_key(|id| counter_suffix(id))
        .map(ToOwned::to_owned)
        .or_else(|| {
            sak.original_soknad_nav
                .as_ref()
                .map(|o| format!("{}0000", o.nav_ekstern_ref_id))
        })
        .unwrap_or_else(|| format!("{}0000", sak.fiks_digisos_id));

    let next = counter_suffix(&previous) + 1;
    let stem = previous
        .char_indices()
        .rev()
        .nth(COUNTER_SUFFIX_LENGTH - 1)
        .map_or("", |(i, _)| &previous[..i]);
    format!("{stem}{next:04}")
}

fn counter_suffix(id: &str) -> u64 {
    let start = id.len().saturating_sub(COUNTER_SUFFIX_LENGTH);
    id.get(start..).and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Wall-clock time in Norway, whatever zone the server runs in.
#[must_use]
pub fn now_oslo() -> NaiveDateTime {
    Utc::now().with_timezone(&Oslo).naive_local()
}

#[must_use]
pub fn today_oslo() -> NaiveDate {
    now_oslo().date()
}

/// Minutes since the application was sent, or -1 when unknown.
#[must_use]
pub fn soknadsalder_i_minutter(tidspunkt_sendt: Option<NaiveDateTime>) -> i64 {
    tidspunkt_sendt.map_or(-1, |t| (now_oslo() - t).num_minutes())
}

#[must_use]
pub fn dokumentlager_url(base: &str, dokumentlager_id: &str) -> String {
    format!("{base}/dokumentlager/nedlasting/niva4/{dokumentlager_id}?inline=true")
}

/// Public link to a file in dokumentlager or SvarUt.
#[must_use]
pub fn url_fra_filreferanse(dokumentlager_base: &str, svarut_base: &str, referanse: &JsonFilreferanse) -> String {
    match referanse {
        JsonFilreferanse::Dokumentlager { id } => dokumentlager_url(dokumentlager_base, id),
        JsonFilreferanse::Svarut { id, nr } => format!("{svarut_base}/forsendelse/{id}/{nr}?inline=true"),
    }
}

/// Unix millis to Oslo wall-clock time. Returns `None` for out-of-range values.
#[must_use]
pub fn unix_millis_to_local(millis: i64) -> Option<NaiveDateTime> {
    Oslo.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.naive_local())
}

/// Parses an ISO-8601 timestamp with offset (`2018-10-04T13:37:00.134Z`)
/// and converts it to Oslo wall-clock time.
///
/// # Errors
/// `DomainError::Unexpected` when the value is not a valid zoned timestamp;
/// these come from the case system, not the citizen.
pub fn to_local_date_time(value: &str) -> Result<NaiveDateTime, DomainError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Oslo).naive_local())
        .map_err(|e| DomainError::Unexpected(anyhow::anyhow!("Ugyldig tidspunkt '{value}': {e}")))
}

/// Parses an ISO local date (`2019-10-01`).
///
/// # Errors
/// `DomainError::Unexpected` when the value is not a valid date.
pub fn to_local_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DomainError::Unexpected(anyhow::anyhow!("Ugyldig dato '{value}': {e}")))
}

/// Optional variant of [`to_local_date`].
///
/// # Errors
/// As [`to_local_date`].
pub fn to_optional_local_date(value: Option<&str>) -> Result<Option<NaiveDate>, DomainError> {
    value.map(to_local_date).transpose()
}

/// NFC-normalised and trimmed; some browsers send Norwegian letters as a
/// base letter plus a combining mark.
#[must_use]
pub fn sanitize_file_name(filename: &str) -> String {
    filename.nfc().collect::<String>().trim().to_owned()
}

#[must_use]
pub fn contains_illegal_characters(filename: &str) -> bool {
    ILLEGAL_FILENAME_CHARS.is_match(&sanitize_file_name(filename))
}

/// Strips the `-<uuid8>` marker added on upload, keeping the extension.
#[must_use]
pub fn remove_uuid_from_filename(filename: &str) -> String {
    let Some(dot) = filename.rfind('.') else {
        return filename.to_owned();
    };
    if dot <= LENGTH_OF_UUID_PART {
        return filename.to_owned();
    }
    let marker = dot - LENGTH_OF_UUID_PART;
    let Some(uuid_part) = filename.get(marker..dot) else {
        return filename.to_owned();
    };
    if uuid_part.starts_with('-') && uuid_part[1..].chars().all(|c| c.is_ascii_hexdigit()) {
        format!("{}{}", &filename[..marker], &filename[dot..])
    } else {
        filename.to_owned()
    }
}

/// Groups `items` by `key`. Groups appear in the order their first item was
/// seen, and items keep their relative order.
pub fn group_by<T, K: PartialEq>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<(K, Vec<T>)> {
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, group)) => group.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

/// Splits `name.ext` when the extension is one we accept for upload.
#[must_use]
pub fn split_file_name(filename: &str) -> (&str, &str) {
    if let Some(dot) = filename.rfind('.') {
        let ext = &filename[dot..];
        if matches!(ext, ".jpg" | ".jpeg" | ".png" | ".pdf") {
            return (&filename[..dot], ext);
        }
    }
    (filename, "")
}
