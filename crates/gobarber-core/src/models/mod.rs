//! Data models exchanged with the GoBarber API.
//!
//! This module contains:
//!
//! - `User`: the authenticated user record cached by the session store
//! - `Credentials`, `NewUser`, `ProfileUpdate`, `ResetPassword`: request bodies
//! - `Appointment`, `MonthAvailabilityItem`: dashboard schedule data

pub mod appointment;
pub mod forms;
pub mod user;

pub use appointment::{
    disabled_days, is_bookable_weekday, next_appointment, split_by_period, unavailable_days,
    Appointment, AppointmentUser, MonthAvailabilityItem,
};
pub use forms::{token_from_query, Credentials, FormError, NewUser, ProfileUpdate, ResetPassword};
pub use user::User;
