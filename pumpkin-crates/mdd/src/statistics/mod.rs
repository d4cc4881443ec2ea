//! Contains structures related to the statistic logging of the [`Solver`] and its decision
//! diagrams.
//!
//! [`Solver`]: crate::Solver
pub(crate) mod statistic_logger;
pub(crate) mod statistic_logging;

use std::fmt::Display;

pub use statistic_logger::StatisticLogger;
pub use statistic_logging::configure_statistic_logging;
pub use statistic_logging::log_statistic;
pub use statistic_logging::log_statistic_postfix;
pub use statistic_logging::should_log_statistics;
pub use statistic_logging::StatisticOptions;

/// A simple trait for defining a loggable statistic.
///
/// See [`create_statistics_struct!`] for creating a statistic struct automatically!
///
/// [`create_statistics_struct!`]: crate::create_statistics_struct
pub(crate) trait Statistic {
    /// Logs the [`Statistic`] using the provided [`StatisticLogger`].
    fn log(&self, statistic_logger: StatisticLogger);
}

impl<Value: Display> Statistic for Value {
    fn log(&self, statistic_logger: StatisticLogger) {
        statistic_logger.log_statistic(self);
    }
}

/// A macro for generating a struct for storing statistics.
///
/// # Example
/// ```rust
/// # use pumpkin_mdd::create_statistics_struct;
/// create_statistics_struct!(Statistics {
///     number_of_calls: usize
/// });
///
/// let statistics = Statistics::default();
///
/// assert_eq!(statistics.number_of_calls, 0);
/// ```
#[macro_export]
macro_rules! create_statistics_struct {
    ($(#[$struct_documentation:meta])* $name:ident { $($(#[$variable_documentation:meta])* $field:ident : $type:ident),+ $(,)? }) => {
        $(#[$struct_documentation])*
        #[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
        pub struct $name {
            $($(#[$variable_documentation])* pub $field: $type),+
        }

        impl $name {
            /// Adds the values of `other` to the values of `self`.
            pub fn accumulate(&mut self, other: &$name) {
                $(self.$field += other.$field;)+
            }

            /// Logs every field using the provided [`StatisticLogger`].
            ///
            /// [`StatisticLogger`]: $crate::statistics::StatisticLogger
            pub fn log(&self, statistic_logger: $crate::statistics::StatisticLogger) {
                $($crate::statistics::log_field(&self.$field, statistic_logger.attach_to_prefix(stringify!($field)));)+
            }
        }
    };
}

#[doc(hidden)]
pub fn log_field(value: &impl Display, statistic_logger: StatisticLogger) {
    value.log(statistic_logger)
}
