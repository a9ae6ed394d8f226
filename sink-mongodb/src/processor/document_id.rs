use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::trace;

use crate::config::ValidatedConfig;
use crate::error::SinkResult;
use crate::id_strategy::{select_strategy, IdStrategy};
use crate::record::{RecordCoordinates, SinkDocument, ID_FIELD};

use super::{PostProcessor, DOCUMENT_ID_ADDER};

/// Sets `_id` on the value document from the configured id strategy
///
/// Records without a value document pass through untouched.
#[derive(Debug)]
pub struct DocumentIdAdder {
    strategy: Arc<dyn IdStrategy>,
}

impl DocumentIdAdder {
    pub fn new(strategy: Arc<dyn IdStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &Arc<dyn IdStrategy> {
        &self.strategy
    }
}

impl PostProcessor for DocumentIdAdder {
    fn process(
        &self,
        doc: &mut SinkDocument,
        coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        if doc.value.is_some() {
            let id = self.strategy.generate_id(doc, coords)?;
            trace!("{} id for offset {}: {}", self.strategy.mode(), coords.offset, id);
            if let Some(value) = doc.value.as_mut() {
                value.insert(ID_FIELD.to_string(), id);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn name(&self) -> &str {
        DOCUMENT_ID_ADDER
    }
}

pub(crate) fn create(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(DocumentIdAdder::new(select_strategy(config)?)))
}
