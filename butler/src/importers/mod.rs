//! Importers turn external signals (weather, calendar, USPS mail, generated facts) into memories.
//!
//! Each importer owns its source tag and replaces its own previous rows before inserting, so
//! re-running a job never duplicates memories.

pub mod calendar;
pub mod fun_facts;
pub mod usps;
pub mod weather;

pub use calendar::{CalendarEvent, CalendarImporter, EventTime};
pub use fun_facts::{parse_facts, FunFact, FunFactGenerator};
pub use usps::{EmailAttachment, EmailPayload, MailPiece, PackageNotice, UspsProcessor, UspsReport};
pub use weather::{DaySummary, WeatherImporter};
