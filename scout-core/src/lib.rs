pub mod cabin;
pub mod airports;
pub mod route;
pub mod availability;
pub mod filter;
pub mod view;
pub mod calendar;
pub mod pricing;
pub mod itinerary;

pub use cabin::CabinClass;
pub use airports::{Airport, AirportDirectory};
pub use availability::{
    AggregatedAvailability, AggregatedDayRoute, RawAvailabilityRecord, RecordIndex,
};
pub use filter::{FilterAction, FilterMode, FilterSet, FilterSetAction, FilterState};
pub use view::{filter_view, CalendarView, VisibleRoute};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unexpected data shape: {0}")]
    DataShapeError(String),
    #[error("Reference data error: {0}")]
    ReferenceDataError(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
