use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Appointments before this hour belong to the morning section of the schedule
const AFTERNOON_STARTS_AT_HOUR: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AppointmentUser {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An appointment booked with the signed-in provider (`GET /appointments/me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Appointment {
    pub id: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub date: DateTime<Utc>,
    #[serde(rename = "User", alias = "user")]
    pub user: AppointmentUser,
}

impl Appointment {
    /// Hour of day in the given timezone
    pub fn hour_in<Tz: TimeZone>(&self, tz: &Tz) -> u32 {
        self.date.with_timezone(tz).hour()
    }

    /// `HH:MM` in the given timezone
    pub fn hour_formatted<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.date.with_timezone(tz).format("%H:%M").to_string()
    }

    pub fn is_morning<Tz: TimeZone>(&self, tz: &Tz) -> bool {
        self.hour_in(tz) < AFTERNOON_STARTS_AT_HOUR
    }
}

/// Split a day's appointments into (morning, afternoon)
pub fn split_by_period<'a, Tz: TimeZone>(
    appointments: &'a [Appointment],
    tz: &Tz,
) -> (Vec<&'a Appointment>, Vec<&'a Appointment>) {
    appointments.iter().partition(|a| a.is_morning(tz))
}

/// The first appointment still ahead of `now`, in list order
pub fn next_appointment(appointments: &[Appointment], now: DateTime<Utc>) -> Option<&Appointment> {
    appointments.iter().find(|a| a.date > now)
}

/// One day of a provider's month calendar (`GET /providers/:id/month-availability`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MonthAvailabilityItem {
    pub day: u32,
    pub available: bool,
}

/// Dates of the month that have no free slot left.
/// Days that do not exist in the month are skipped.
pub fn unavailable_days(items: &[MonthAvailabilityItem], year: i32, month: u32) -> Vec<NaiveDate> {
    items
        .iter()
        .filter(|item| !item.available)
        .filter_map(|item| NaiveDate::from_ymd_opt(year, month, item.day))
        .collect()
}

/// Weekends are never bookable
pub fn is_bookable_weekday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}

/// Days of the month the calendar does not let a client pick: weekends and
/// fully booked days, in date order.
pub fn disabled_days(items: &[MonthAvailabilityItem], year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let full = unavailable_days(items, year, month);
    first
        .iter_days()
        .take_while(|day| day.month() == month)
        .filter(|day| !is_bookable_weekday(*day) || full.contains(day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(id: &str, date: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            date: date.parse().unwrap(),
            user: AppointmentUser {
                name: "Client".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn test_appointment_parses_api_payload() {
        let raw = r#"{"id":"a1","date":"2020-06-10T14:00:00.000Z","User":{"name":"Jhon","avatar_url":null}}"#;
        let parsed: Appointment = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.hour_in(&Utc), 14);
        assert_eq!(parsed.hour_formatted(&Utc), "14:00");
        assert_eq!(parsed.user.name, "Jhon");
    }

    #[test]
    fn test_split_by_period() {
        let list = vec![
            appointment("a", "2020-06-10T08:00:00Z"),
            appointment("b", "2020-06-10T12:00:00Z"),
            appointment("c", "2020-06-10T11:59:00Z"),
            appointment("d", "2020-06-10T17:00:00Z"),
        ];
        let (morning, afternoon) = split_by_period(&list, &Utc);
        let ids = |v: Vec<&Appointment>| v.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(morning), vec!["a", "c"]);
        assert_eq!(ids(afternoon), vec!["b", "d"]);
    }

    #[test]
    fn test_next_appointment() {
        let list = vec![
            appointment("past", "2020-06-10T08:00:00Z"),
            appointment("soon", "2020-06-10T15:00:00Z"),
            appointment("later", "2020-06-10T17:00:00Z"),
        ];
        let now: DateTime<Utc> = "2020-06-10T09:30:00Z".parse().unwrap();
        assert_eq!(next_appointment(&list, now).map(|a| a.id.as_str()), Some("soon"));

        let evening: DateTime<Utc> = "2020-06-10T20:00:00Z".parse().unwrap();
        assert!(next_appointment(&list, evening).is_none());
    }

    #[test]
    fn test_unavailable_days() {
        let items = vec![
            MonthAvailabilityItem { day: 1, available: true },
            MonthAvailabilityItem { day: 2, available: false },
            MonthAvailabilityItem { day: 31, available: false },
        ];
        // June has 30 days, day 31 is dropped
        let days = unavailable_days(&items, 2020, 6);
        assert_eq!(days, vec![NaiveDate::from_ymd_opt(2020, 6, 2).unwrap()]);
    }

    #[test]
    fn test_is_bookable_weekday() {
        assert!(is_bookable_weekday(NaiveDate::from_ymd_opt(2020, 6, 10).unwrap())); // Wednesday
        assert!(!is_bookable_weekday(NaiveDate::from_ymd_opt(2020, 6, 13).unwrap())); // Saturday
        assert!(!is_bookable_weekday(NaiveDate::from_ymd_opt(2020, 6, 14).unwrap())); // Sunday
    }

    #[test]
    fn test_disabled_days_cover_weekends_and_full_days() {
        let items = vec![
            MonthAvailabilityItem { day: 10, available: false },
            // Saturday, already disabled as a weekend
            MonthAvailabilityItem { day: 13, available: false },
        ];
        let days = disabled_days(&items, 2020, 6);
        let numbers: Vec<u32> = days.iter().map(|d| d.day()).collect();
        // June 2020 weekends: 6-7, 13-14, 20-21, 27-28
        assert_eq!(numbers, vec![6, 7, 10, 13, 14, 20, 21, 27, 28]);
    }

    #[test]
    fn test_disabled_days_invalid_month() {
        assert!(disabled_days(&[], 2020, 13).is_empty());
    }

    #[cfg(feature = "ts")]
    #[test]
    fn test_ts_exports_date_as_string() {
        use ts_rs::TS;
        let decl = Appointment::decl();
        assert!(decl.contains("date: string"), "{}", decl);
    }
}
