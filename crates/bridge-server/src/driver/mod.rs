//! Automation driver implementations.

#[cfg(test)]
pub mod mock;
pub mod webdriver;

pub use webdriver::WebDriverFactory;
