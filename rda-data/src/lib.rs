//! Transformation of hourly ERA5-Land point series into local daily forcing.
//!
//! Every stage is a pure function of its input series and the
//! [`VariableSet`](rda_era5::variable::VariableSet) it is given. Nothing here
//! reads or writes files.

pub mod climate;
pub mod deaccumulate;
pub mod local_time;
pub mod pet;
pub mod pipeline;
pub mod sign;
pub mod units;

pub use pipeline::Pipeline;

/// Final rounding of daily records
pub mod rounding {
    use rda_era5::daily::DailyRecord;
    use rda_utils::numbers::round_to;

    /// Round every present value of the record to `decimals` places.
    pub fn round_record(record: &mut DailyRecord, decimals: u32) {
        for value in record.values.values_mut().flatten() {
            *value = round_to(*value, decimals);
        }
    }

}
