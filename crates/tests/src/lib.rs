//! Cross-crate tests for the Quietwave pipeline

#[cfg(test)]
mod pipeline_integration;
