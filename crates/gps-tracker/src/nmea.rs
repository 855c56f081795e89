//! NMEA 0183 sentence parsing
//!
//! Only the two sentences a consumer-grade puck emits with position data are
//! decoded: GGA (fix data) and RMC (recommended minimum). Any talker id is
//! accepted (`GP`, `GN`, `GL`, ...). Other sentence types parse to `None`.

use crate::error::GpsError;
use crate::fix::{FixUpdate, Position};
use crate::KNOTS_TO_KMH;
use chrono::{NaiveDate, NaiveTime, Utc};

/// Parse one NMEA sentence into the fields it carries
pub fn parse_sentence(line: &str) -> Result<Option<FixUpdate>, GpsError> {
    let line = line.trim();
    let body = line
        .strip_prefix('$')
        .ok_or_else(|| GpsError::Parse(format!("missing '$' start delimiter: {line:?}")))?;

    let data = match body.split_once('*') {
        Some((data, checksum)) => {
            verify_checksum(data, checksum)?;
            data
        }
        None => body,
    };

    let mut fields = data.split(',');
    let header = fields.next().unwrap_or_default();
    if header.len() < 5 || !header.is_ascii() {
        return Err(GpsError::Parse(format!("bad sentence header: {header:?}")));
    }
    let fields: Vec<&str> = fields.collect();

    match &header[header.len() - 3..] {
        "GGA" => parse_gga(&fields).map(Some),
        "RMC" => parse_rmc(&fields).map(Some),
        _ => Ok(None),
    }
}

/// XOR of every byte between `$` and `*`
pub fn checksum(data: &str) -> u8 {
    data.bytes().fold(0, |acc, b| acc ^ b)
}

fn verify_checksum(data: &str, checksum_hex: &str) -> Result<(), GpsError> {
    let expected = u8::from_str_radix(checksum_hex.trim(), 16)
        .map_err(|_| GpsError::Parse(format!("bad checksum field: {checksum_hex:?}")))?;
    let actual = checksum(data);
    if expected != actual {
        return Err(GpsError::Checksum { expected, actual });
    }
    Ok(())
}

// $GPGGA,hhmmss.ss,llll.ll,a,yyyyy.yy,a,q,nn,h.h,a.a,M,g.g,M,x.x,xxxx
fn parse_gga(fields: &[&str]) -> Result<FixUpdate, GpsError> {
    if fields.len() < 9 {
        return Err(GpsError::Parse(format!(
            "GGA needs at least 9 fields, got {}",
            fields.len()
        )));
    }

    let timestamp = parse_time(fields[0])?
        .map(|time| Utc::now().date_naive().and_time(time).and_utc());

    Ok(FixUpdate {
        position: parse_position(fields[1], fields[2], fields[3], fields[4])?,
        altitude: parse_number(fields[8], "altitude")?,
        fix_quality: parse_number(fields[5], "fix quality")?,
        satellites: parse_number(fields[6], "satellites")?,
        horizontal_dilution: parse_number(fields[7], "hdop")?,
        timestamp,
        ..Default::default()
    })
}

// $GPRMC,hhmmss.ss,A,llll.ll,a,yyyyy.yy,a,x.x,x.x,ddmmyy,x.x,a
fn parse_rmc(fields: &[&str]) -> Result<FixUpdate, GpsError> {
    if fields.len() < 9 {
        return Err(GpsError::Parse(format!(
            "RMC needs at least 9 fields, got {}",
            fields.len()
        )));
    }

    let speed_knots: Option<f64> = parse_number(fields[6], "speed")?;
    let timestamp = match (parse_date(fields[8])?, parse_time(fields[0])?) {
        (Some(date), Some(time)) => Some(date.and_time(time).and_utc()),
        _ => None,
    };

    Ok(FixUpdate {
        position: parse_position(fields[2], fields[3], fields[4], fields[5])?,
        speed: speed_knots.map(|knots| knots * KNOTS_TO_KMH),
        timestamp,
        ..Default::default()
    })
}

fn parse_number<T: std::str::FromStr>(field: &str, name: &str) -> Result<Option<T>, GpsError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| GpsError::Parse(format!("bad {name} field: {field:?}")))
}

fn parse_position(
    lat: &str,
    lat_hemisphere: &str,
    lon: &str,
    lon_hemisphere: &str,
) -> Result<Option<Position>, GpsError> {
    let latitude = parse_coordinate(lat, lat_hemisphere, 'N', 'S')?;
    let longitude = parse_coordinate(lon, lon_hemisphere, 'E', 'W')?;
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(Position::new(latitude, longitude))),
        _ => Ok(None),
    }
}

/// `dddmm.mmmm` plus hemisphere letter to signed decimal degrees
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    positive: char,
    negative: char,
) -> Result<Option<f64>, GpsError> {
    let Some(raw) = parse_number::<f64>(value, "coordinate")? else {
        return Ok(None);
    };
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(GpsError::Parse(format!("bad coordinate minutes: {value:?}")));
    }
    let magnitude = degrees + minutes / 60.0;

    match hemisphere.trim().chars().next() {
        Some(c) if c == positive => Ok(Some(magnitude)),
        Some(c) if c == negative => Ok(Some(-magnitude)),
        _ => Err(GpsError::Parse(format!("bad hemisphere: {hemisphere:?}"))),
    }
}

/// `hhmmss[.sss]`
fn parse_time(field: &str) -> Result<Option<NaiveTime>, GpsError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    let bad = || GpsError::Parse(format!("bad time field: {field:?}"));
    if field.len() < 6 || !field.is_ascii() {
        return Err(bad());
    }

    let hour: u32 = field[0..2].parse().map_err(|_| bad())?;
    let minute: u32 = field[2..4].parse().map_err(|_| bad())?;
    let seconds: f64 = field[4..].parse().map_err(|_| bad())?;
    let whole = seconds.trunc() as u32;
    let millis = ((seconds - seconds.trunc()) * 1000.0).round().min(999.0) as u32;

    NaiveTime::from_hms_milli_opt(hour, minute, whole, millis)
        .map(Some)
        .ok_or_else(bad)
}

/// `ddmmyy`
fn parse_date(field: &str) -> Result<Option<NaiveDate>, GpsError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    let bad = || GpsError::Parse(format!("bad date field: {field:?}"));
    if field.len() != 6 || !field.is_ascii() {
        return Err(bad());
    }

    let day: u32 = field[0..2].parse().map_err(|_| bad())?;
    let month: u32 = field[2..4].parse().map_err(|_| bad())?;
    let year: i32 = field[4..6].parse().map_err(|_| bad())?;

    NaiveDate::from_ymd_opt(2000 + year, month, day)
        .map(Some)
        .ok_or_else(bad)
}
