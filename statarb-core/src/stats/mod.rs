//! Statistics primitives: descriptive stats, OLS, ADF, MacKinnon p-values.

pub mod adf;
pub mod descriptive;
pub mod mackinnon;
pub mod ols;

pub use adf::{adf_test, schwert_max_lag, AdfResult, Deterministic};
pub use descriptive::{mean, pearson, rolling_mean_std, sample_std, simple_returns};
pub use mackinnon::{adf_p_value, cointegration_p_value};
pub use ols::{linear_fit, LinearFit, Ols};
