use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Keyset cursor shared by every paginated feed: the `(sort key, id)` pair
/// of the last row of the previous page. Encoded as URL-safe base64 over
/// `"{rfc3339}|{uuid}"` so clients treat it as opaque.
///
/// Ordering is always `(sort_ts DESC, tie_break DESC)`, which stays stable
/// when newer rows are inserted between page requests.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Cursor {
    pub sort_ts: DateTime<Utc>,
    pub tie_break: uuid::Uuid,
}

impl Cursor {
    pub fn new(sort_ts: DateTime<Utc>, tie_break: uuid::Uuid) -> Self {
        Self { sort_ts, tie_break }
    }

    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}",
            self.sort_ts.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.tie_break
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .map_err(|e| format!("cursor base64: {e}"))?;
        let raw = String::from_utf8(raw).map_err(|e| format!("cursor utf8: {e}"))?;

        let (ts_str, id_str) = raw.split_once('|').ok_or("cursor missing separator")?;
        let sort_ts = DateTime::parse_from_rfc3339(ts_str)
            .map_err(|e| format!("cursor timestamp: {e}"))?
            .with_timezone(&Utc);
        let tie_break =
            uuid::Uuid::parse_str(id_str).map_err(|e| format!("cursor id: {e}"))?;

        Ok(Cursor { sort_ts, tie_break })
    }
}

/// One page of a feed, with the n+1 trick already applied.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// `rows` must hold up to `page_size + 1` rows in feed order; `key_of`
    /// extracts a row's `(sort key, id)` pair. The extra row, if present,
    /// only signals `has_more` and is dropped.
    pub fn from_rows<F>(mut rows: Vec<T>, page_size: usize, key_of: F) -> Self
    where
        F: Fn(&T) -> Cursor,
    {
        let has_more = rows.len() > page_size;
        if has_more {
            rows.truncate(page_size);
        }
        let next_cursor = if has_more {
            rows.last().map(|r| key_of(r).encode())
        } else {
            None
        };
        Page {
            items: rows,
            has_more,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 123_000).unwrap()
    }

    #[test]
    fn round_trips_through_opaque_form() {
        let cursor = Cursor::new(ts(1_700_000_000), uuid::Uuid::new_v4());
        let encoded = cursor.encode();
        assert!(!encoded.contains('|'));
        assert_eq!(encoded.parse::<Cursor>().unwrap(), cursor);
    }

    #[test]
    fn rejects_garbage() {
        assert!("definitely not a cursor!".parse::<Cursor>().is_err());
        let no_sep = URL_SAFE_NO_PAD.encode(b"just-one-field");
        assert!(no_sep.parse::<Cursor>().is_err());
    }

    #[test]
    fn page_applies_n_plus_one() {
        let ids: Vec<uuid::Uuid> = (0..3).map(|_| uuid::Uuid::new_v4()).collect();
        let rows: Vec<(DateTime<Utc>, uuid::Uuid)> =
            ids.iter().enumerate().map(|(i, id)| (ts(100 - i as i64), *id)).collect();

        let page = Page::from_rows(rows.clone(), 2, |r| Cursor::new(r.0, r.1));
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        let next: Cursor = page.next_cursor.unwrap().parse().unwrap();
        assert_eq!(next.tie_break, ids[1]);

        let last = Page::from_rows(rows[2..].to_vec(), 2, |r| Cursor::new(r.0, r.1));
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
        assert!(last.next_cursor.is_none());
    }
}
