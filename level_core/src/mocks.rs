//! Test and helper mocks for level_core

use std::time::Duration;

/// An input that always errors on read; useful for exercising skip paths.
pub struct FailingAdc;

impl level_traits::AnalogInput for FailingAdc {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("failing adc")))
    }
}

/// An input that replays a fixed script of reads, then repeats the last entry.
///
/// An optional hook runs on every read with the zero-based read index; tests
/// use it to advance a shared test clock and model conversion time.
pub struct ScriptedAdc {
    script: Vec<Result<i32, String>>,
    reads: usize,
    on_read: Option<Box<dyn FnMut(usize)>>,
}

impl ScriptedAdc {
    pub fn new(script: impl IntoIterator<Item = Result<i32, &'static str>>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|r| r.map_err(str::to_string))
                .collect(),
            reads: 0,
            on_read: None,
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = i32>) -> Self {
        Self::new(values.into_iter().map(Ok))
    }

    pub fn with_read_hook(mut self, hook: impl FnMut(usize) + 'static) -> Self {
        self.on_read = Some(Box::new(hook));
        self
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl level_traits::AnalogInput for ScriptedAdc {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let idx = self.reads;
        self.reads += 1;
        if let Some(hook) = self.on_read.as_mut() {
            hook(idx);
        }
        let entry = self
            .script
            .get(idx)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Err("empty script".to_string()));
        entry.map_err(Into::into)
    }
}
