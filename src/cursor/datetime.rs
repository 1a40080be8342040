//! Datetime-window cursor

use super::Cursor;
use crate::error::{Error, Result};
use crate::types::{
    JsonObject, JsonValue, Record, RequestOption, RequestOptionType, StreamSlice, StringMap,
};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Slice field carrying the window start
pub const START_TIME_FIELD: &str = "start_time";
/// Slice field carrying the window end
pub const END_TIME_FIELD: &str = "end_time";

/// A window step or lookback span: a plain time span, or whole months for
/// calendar-aligned steps (`P1M`, `P1Y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDuration {
    /// Fixed time span
    Time(Duration),
    /// Whole calendar months
    Months(u32),
}

impl StepDuration {
    /// Parse a span string: ISO-8601-style (`P1D`, `P2W`, `P1M`, `P1Y`,
    /// `PT30M`, `PT0.000001S`) or shorthand (`1d`, `2h`, `30m`, `10s`, `1w`)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::config("empty duration"));
        }

        if let Some(rest) = s.strip_prefix(['P', 'p']) {
            return Self::parse_iso(rest, s);
        }
        Self::parse_shorthand(s)
    }

    fn parse_iso(rest: &str, original: &str) -> Result<Self> {
        if let Some(time) = rest.strip_prefix(['T', 't']) {
            let (num, unit) = split_unit(time, original)?;
            let value: f64 = num
                .parse()
                .map_err(|_| Error::config(format!("Invalid duration: {original}")))?;
            let seconds = match unit {
                'H' | 'h' => value * 3600.0,
                'M' | 'm' => value * 60.0,
                'S' | 's' => value,
                _ => return Err(Error::config(format!("Invalid duration: {original}"))),
            };
            return Ok(Self::Time(Duration::nanoseconds(
                (seconds * 1_000_000_000.0).round() as i64,
            )));
        }

        let (num, unit) = split_unit(rest, original)?;
        let value: i64 = num
            .parse()
            .map_err(|_| Error::config(format!("Invalid duration: {original}")))?;
        match unit {
            'D' | 'd' => Ok(Self::Time(Duration::days(value))),
            'W' | 'w' => Ok(Self::Time(Duration::weeks(value))),
            'M' | 'm' => Ok(Self::Months(value as u32)),
            'Y' | 'y' => Ok(Self::Months(value as u32 * 12)),
            _ => Err(Error::config(format!("Invalid duration: {original}"))),
        }
    }

    fn parse_shorthand(s: &str) -> Result<Self> {
        let (num_str, suffix) = if let Some(stripped) = s.strip_suffix('d') {
            (stripped, 'd')
        } else if let Some(stripped) = s.strip_suffix('h') {
            (stripped, 'h')
        } else if let Some(stripped) = s.strip_suffix('m') {
            (stripped, 'm')
        } else if let Some(stripped) = s.strip_suffix('s') {
            (stripped, 's')
        } else if let Some(stripped) = s.strip_suffix('w') {
            (stripped, 'w')
        } else {
            (s, 'd')
        };

        let num: i64 = num_str
            .parse()
            .map_err(|_| Error::config(format!("Invalid duration number: {num_str}")))?;

        let duration = match suffix {
            'w' => Duration::weeks(num),
            'd' => Duration::days(num),
            'h' => Duration::hours(num),
            'm' => Duration::minutes(num),
            's' => Duration::seconds(num),
            _ => unreachable!(),
        };
        Ok(Self::Time(duration))
    }

    /// The span as a plain time duration, when it is one
    pub fn as_time(&self) -> Option<Duration> {
        match self {
            Self::Time(d) => Some(*d),
            Self::Months(_) => None,
        }
    }

    fn add_to(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Time(d) => dt + *d,
            Self::Months(m) => dt.checked_add_months(Months::new(*m)).unwrap_or(dt),
        }
    }

    fn sub_from(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Time(d) => dt - *d,
            Self::Months(m) => dt.checked_sub_months(Months::new(*m)).unwrap_or(dt),
        }
    }
}

fn split_unit<'a>(s: &'a str, original: &str) -> Result<(&'a str, char)> {
    let unit = s
        .chars()
        .last()
        .ok_or_else(|| Error::config(format!("Invalid duration: {original}")))?;
    Ok((&s[..s.len() - unit.len_utf8()], unit))
}

/// Cursor slicing a `[start, end]` range into consecutive windows.
///
/// Windows are closed on both ends; with a step configured, an inner
/// window ends one `cursor_granularity` before the next window starts so
/// boundary records are never double-counted, and the final window ends
/// exactly at the effective end. A range whose span is an exact multiple
/// of the step therefore ends with a zero-width `[end, end]` tail window.
///
/// The effective start is `max(start, persisted cursor) - lookback`; the
/// effective end is `min(end, now)`. An effective end before the effective
/// start yields zero slices.
#[derive(Debug, Clone)]
pub struct DatetimeCursor {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    cursor_field: String,
    datetime_format: String,
    step: Option<StepDuration>,
    cursor_granularity: Option<Duration>,
    lookback_window: Option<StepDuration>,
    start_time_option: Option<RequestOption>,
    end_time_option: Option<RequestOption>,
    cursor: Option<DateTime<Utc>>,
    highest_observed: Option<DateTime<Utc>>,
}

impl DatetimeCursor {
    /// Create a cursor over `[start, now]` with no windowing
    pub fn new(
        start: &str,
        cursor_field: impl Into<String>,
        datetime_format: impl Into<String>,
    ) -> Result<Self> {
        let datetime_format = datetime_format.into();
        let start = parse_datetime(start, &datetime_format)?;
        Ok(Self {
            start,
            end: None,
            cursor_field: cursor_field.into(),
            datetime_format,
            step: None,
            cursor_granularity: None,
            lookback_window: None,
            start_time_option: None,
            end_time_option: None,
            cursor: None,
            highest_observed: None,
        })
    }

    /// Bound the range on the right (default is "now" at slicing time)
    pub fn with_end(mut self, end: &str) -> Result<Self> {
        self.end = Some(parse_datetime(end, &self.datetime_format)?);
        Ok(self)
    }

    /// Cut the range into windows of `step`, with `cursor_granularity`
    /// separating consecutive windows. The two only make sense together,
    /// so they are configured together.
    pub fn with_step(mut self, step: &str, cursor_granularity: &str) -> Result<Self> {
        self.step = Some(StepDuration::parse(step)?);
        let granularity = StepDuration::parse(cursor_granularity)?
            .as_time()
            .ok_or_else(|| {
                Error::config("cursor_granularity must be a time span, not months")
            })?;
        self.cursor_granularity = Some(granularity);
        Ok(self)
    }

    /// Extend the next sync backward to re-capture late-arriving data
    pub fn with_lookback_window(mut self, lookback: &str) -> Result<Self> {
        self.lookback_window = Some(StepDuration::parse(lookback)?);
        Ok(self)
    }

    /// Inject the window start into requests
    #[must_use]
    pub fn with_start_time_option(mut self, option: RequestOption) -> Self {
        self.start_time_option = Some(option);
        self
    }

    /// Inject the window end into requests
    #[must_use]
    pub fn with_end_time_option(mut self, option: RequestOption) -> Self {
        self.end_time_option = Some(option);
        self
    }

    /// Seed from a persisted state mapping (`{<cursor_field>: <value>}`).
    /// Unknown shapes or missing fields leave the cursor unseeded.
    pub fn with_state(mut self, state: &JsonValue) -> Result<Self> {
        if let Some(value) = state.get(&self.cursor_field) {
            let rendered = render_cursor_value(value)
                .ok_or_else(|| Error::state(format!("unusable cursor value: {value}")))?;
            self.cursor = Some(parse_datetime(&rendered, &self.datetime_format)?);
        }
        Ok(self)
    }

    /// The cursor field name
    pub fn cursor_field(&self) -> &str {
        &self.cursor_field
    }

    /// Parse a datetime string using this cursor's format (with common
    /// fallbacks)
    pub fn parse_datetime(&self, s: &str) -> Result<DateTime<Utc>> {
        parse_datetime(s, &self.datetime_format)
    }

    /// Format an instant using this cursor's format
    pub fn format_datetime(&self, dt: DateTime<Utc>) -> String {
        format_datetime(dt, &self.datetime_format)
    }

    fn effective_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        let end = self.end.map_or(now, |e| e.min(now));

        let mut start = self.start;
        if let Some(cursor) = self.cursor {
            start = start.max(cursor);
        }
        if let Some(lookback) = &self.lookback_window {
            start = lookback.sub_from(start);
        }
        (start, end)
    }

    fn window_slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StreamSlice {
        let mut window = JsonObject::new();
        window.insert(
            START_TIME_FIELD.to_string(),
            JsonValue::String(self.format_datetime(start)),
        );
        window.insert(
            END_TIME_FIELD.to_string(),
            JsonValue::String(self.format_datetime(end)),
        );
        StreamSlice::from_cursor_window(window)
    }

    fn inject(&self, slice: &StreamSlice, target: RequestOptionType) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (option, field) in [
            (&self.start_time_option, START_TIME_FIELD),
            (&self.end_time_option, END_TIME_FIELD),
        ] {
            if let Some(option) = option {
                if option.inject_into == target {
                    if let Some(JsonValue::String(value)) = slice.get(field) {
                        out.push((option.field_name.clone(), value.clone()));
                    }
                }
            }
        }
        out
    }
}

impl Cursor for DatetimeCursor {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        let (start, end) = self.effective_bounds();
        if start > end {
            return Ok(Vec::new());
        }

        let (Some(step), Some(granularity)) = (self.step, self.cursor_granularity) else {
            return Ok(vec![self.window_slice(start, end)]);
        };

        let mut slices = Vec::new();
        let mut current = start;
        loop {
            let window_end = step.add_to(current) - granularity;
            if window_end >= end {
                slices.push(self.window_slice(current, end));
                break;
            }
            slices.push(self.window_slice(current, window_end));
            current = window_end + granularity;
        }
        Ok(slices)
    }

    fn observe(&mut self, _slice: &StreamSlice, record: &Record) {
        let Some(raw) = record.get(&self.cursor_field).and_then(render_cursor_value) else {
            debug!(cursor_field = %self.cursor_field, "record is missing the cursor field, skipping");
            return;
        };

        match self.parse_datetime(&raw) {
            Ok(instant) => {
                if self.highest_observed.is_none_or(|h| instant > h) {
                    self.highest_observed = Some(instant);
                }
            }
            Err(_) => {
                debug!(value = %raw, "unparseable cursor value, skipping record for state advancement");
            }
        }
    }

    fn close_slice(&mut self, _slice: &StreamSlice) {
        if let Some(observed) = self.highest_observed {
            if self.cursor.is_none_or(|c| observed > c) {
                self.cursor = Some(observed);
            }
        }
    }

    fn stream_state(&self) -> JsonValue {
        let mut state = JsonObject::new();
        if let Some(cursor) = self.cursor {
            state.insert(
                self.cursor_field.clone(),
                JsonValue::String(self.format_datetime(cursor)),
            );
        }
        JsonValue::Object(state)
    }

    fn request_params(&self, slice: &StreamSlice) -> StringMap {
        self.inject(slice, RequestOptionType::RequestParameter)
            .into_iter()
            .collect()
    }

    fn request_headers(&self, slice: &StreamSlice) -> StringMap {
        self.inject(slice, RequestOptionType::Header)
            .into_iter()
            .collect()
    }

    fn request_body_json(&self, slice: &StreamSlice) -> JsonObject {
        self.inject(slice, RequestOptionType::BodyJson)
            .into_iter()
            .map(|(k, v)| (k, JsonValue::String(v)))
            .collect()
    }
}

/// Render a JSON cursor value (string or number) to text
fn render_cursor_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a datetime string: the configured format first, then RFC 3339 and
/// common date forms
fn parse_datetime(s: &str, format: &str) -> Result<DateTime<Utc>> {
    if format == "%s" {
        if let Ok(secs) = s.parse::<i64>() {
            if let Some(dt) = DateTime::from_timestamp(secs, 0) {
                return Ok(dt);
            }
        }
        return Err(Error::DatetimeParse {
            value: s.to_string(),
            format: format.to_string(),
        });
    }

    if let Ok(dt) = DateTime::parse_from_str(s, format) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
        return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, format) {
        return Ok(DateTime::from_naive_utc_and_offset(
            nd.and_hms_opt(0, 0, 0).unwrap_or_default(),
            Utc,
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fallback in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fallback) {
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(DateTime::from_naive_utc_and_offset(
            nd.and_hms_opt(0, 0, 0).unwrap_or_default(),
            Utc,
        ));
    }

    Err(Error::DatetimeParse {
        value: s.to_string(),
        format: format.to_string(),
    })
}

/// Format an instant with a format string (`%s` renders a unix timestamp)
fn format_datetime(dt: DateTime<Utc>, format: &str) -> String {
    if format == "%s" {
        return dt.timestamp().to_string();
    }
    dt.format(format).to_string()
}
