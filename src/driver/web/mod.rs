mod driver;

pub use driver::BrowserExecutor;
