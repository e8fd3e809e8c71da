//! Per-session memoisation of pipeline evaluations.
//!
//! A [`Session`] owns the daily source for the lifetime of a dashboard
//! session and evaluates each distinct (region, settings) pipeline at most
//! once. Results are shared through `Rc`, so the session is meant for a
//! single thread, like the in-memory database it usually wraps.

use crate::pipeline::{Collections, Pipeline, PipelineKey};
use kdss_core::source::DailySource;
use kdss_core::PipelineError;
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub struct Session<S: DailySource> {
    source: S,
    cache: RefCell<HashMap<PipelineKey, Rc<Collections>>>,
    computations: Cell<usize>,
}

impl<S: DailySource> Session<S> {
    pub fn new(source: S) -> Self {
        Session {
            source,
            cache: RefCell::new(HashMap::new()),
            computations: Cell::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collections for `pipeline`, evaluating it only on the first request.
    ///
    /// Failed evaluations are not cached, so a retry re-runs the pipeline.
    pub fn collections(&self, pipeline: &Pipeline) -> Result<Rc<Collections>, PipelineError> {
        let key = pipeline.key();
        if let Some(hit) = self.cache.borrow().get(&key) {
            debug!("session: cache hit for {}", pipeline.region().name);
            return Ok(Rc::clone(hit));
        }
        let collections = Rc::new(pipeline.evaluate(&self.source)?);
        self.computations.set(self.computations.get() + 1);
        self.cache.borrow_mut().insert(key, Rc::clone(&collections));
        info!(
            "session: cached collections for {} ({} entries)",
            pipeline.region().name,
            self.cache.borrow().len()
        );
        Ok(collections)
    }

    /// Number of pipeline evaluations performed so far.
    pub fn computations(&self) -> usize {
        self.computations.get()
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}
