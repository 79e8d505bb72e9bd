// Property suites per area
mod features;
