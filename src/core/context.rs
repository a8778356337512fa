//! # Execution Context Module / 执行上下文模块
//!
//! Every running test owns one [`ExecutionContext`]: which application, data
//! sheet, method, browser and data row it works with. Contexts are never
//! shared between workers, so two tests running side by side cannot observe
//! each other's row, sheet or driver.
//!
//! [`ExecutionScope`] is the acquire/release discipline around a context. It
//! resolves the data row when the test starts and releases the context when it
//! is dropped, which happens on every exit path: normal return, `?`, panic
//! unwinding, or the owning task being aborted.
//!
//! 每个运行中的测试拥有一个 [`ExecutionContext`]：它所使用的应用、数据表、
//! 方法、浏览器和数据行。上下文从不在工作线程之间共享。
//! [`ExecutionScope`] 在测试开始时解析数据行，并在被丢弃时释放上下文，
//! 无论测试以何种方式结束。

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::data::TabularDataSource;
use crate::core::error::Result;
use crate::core::resolver;

/// Something that can produce an evidence reference (e.g. a screenshot path).
pub trait EvidenceSource: Send + Sync {
    fn capture_evidence(&self) -> Result<String>;
}

/// The browser-control collaborator, consumed only as an evidence hook and
/// released with its context.
pub trait BrowserDriver: EvidenceSource {
    fn name(&self) -> &str;

    fn quit(&mut self) -> Result<()>;
}

/// Per-worker state of one test-method invocation.
#[derive(Default)]
pub struct ExecutionContext {
    application: String,
    sheet: String,
    method: String,
    browser: String,
    data: Option<Arc<dyn TabularDataSource>>,
    row: Option<usize>,
    driver: Option<Box<dyn BrowserDriver>>,
}

impl ExecutionContext {
    pub fn new(
        application: impl Into<String>,
        sheet: impl Into<String>,
        method: impl Into<String>,
        browser: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            sheet: sheet.into(),
            method: method.into(),
            browser: browser.into(),
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, driver: Box<dyn BrowserDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn set_application(&mut self, application: impl Into<String>) {
        self.application = application.into();
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn set_sheet(&mut self, sheet: impl Into<String>) {
        self.sheet = sheet.into();
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn browser(&self) -> &str {
        &self.browser
    }

    pub fn set_browser(&mut self, browser: impl Into<String>) {
        self.browser = browser.into();
    }

    pub fn data(&self) -> Option<&Arc<dyn TabularDataSource>> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Arc<dyn TabularDataSource>) {
        self.data = Some(data);
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn set_row(&mut self, row: usize) {
        self.row = Some(row);
    }

    pub fn driver(&self) -> Option<&dyn BrowserDriver> {
        self.driver.as_deref()
    }

    pub fn set_driver(&mut self, driver: Box<dyn BrowserDriver>) {
        self.driver = Some(driver);
    }

    /// The attached driver viewed as an evidence source.
    pub fn evidence(&self) -> Option<&dyn EvidenceSource> {
        self.driver.as_deref().map(|d| d as &dyn EvidenceSource)
    }

    /// Reads a cell of the current row of the current sheet.
    pub fn cell(&self, column: &str) -> Option<String> {
        let data = self.data.as_ref()?;
        data.lookup(&self.sheet, column, self.row?)
    }

    /// All (header, value) pairs of the current row.
    pub fn row_record(&self) -> Vec<(String, String)> {
        match (&self.data, self.row) {
            (Some(data), Some(row)) => data.row_record(&self.sheet, row),
            _ => Vec::new(),
        }
    }

    fn release(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.quit() {
                warn!(method = %self.method, driver = driver.name(), "failed to quit driver: {e}");
            }
        }
        self.data = None;
        self.row = None;
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("application", &self.application)
            .field("sheet", &self.sheet)
            .field("method", &self.method)
            .field("browser", &self.browser)
            .field("row", &self.row)
            .field("has_data", &self.data.is_some())
            .field("driver", &self.driver.as_ref().map(|d| d.name().to_string()))
            .finish()
    }
}

/// Scoped ownership of an [`ExecutionContext`]. Dropping the scope releases
/// the context: the driver is quit and the data handle and row are cleared.
///
/// 对 [`ExecutionContext`] 的作用域所有权。丢弃作用域即释放上下文。
#[derive(Debug)]
pub struct ExecutionScope {
    ctx: ExecutionContext,
}

impl ExecutionScope {
    /// Starts a test: attaches the data source and resolves the method's row.
    ///
    /// A missing row is fatal for the test ([`crate::RunnerError::RowNotFound`]);
    /// the context (and any attached driver) is released before returning.
    pub fn begin(mut ctx: ExecutionContext, data: Arc<dyn TabularDataSource>) -> Result<Self> {
        info!(method = %ctx.method, sheet = %ctx.sheet, browser = %ctx.browser, "test started");
        let row = resolver::require_row(data.as_ref(), &ctx.sheet, &ctx.method);
        ctx.data = Some(data);
        let mut scope = Self { ctx };
        scope.ctx.row = Some(row?);
        Ok(scope)
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    /// Ends the scope explicitly. Equivalent to dropping it.
    pub fn end(self) {}
}

impl Deref for ExecutionScope {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for ExecutionScope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

impl Drop for ExecutionScope {
    fn drop(&mut self) {
        self.ctx.release();
        debug!(method = %self.ctx.method, "execution context released");
    }
}
