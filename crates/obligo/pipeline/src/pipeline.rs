use std::num::NonZeroUsize;
use std::thread;

use obligo_detect::{detect, PatternRegistry};
use obligo_engine::{ObligationEngine, ENGINE_VERSION};
use obligo_ledger::{
    EnvironmentDescriptor, InputDescriptor, InputFormat, LedgerHandle, LedgerStorage, OutputHashes,
    TransactionRecord,
};
use obligo_types::{DetectionResult, ObligationResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::canonicalize::StandardCanonicalizer;
use crate::collaborators::{CanonicalText, Canonicalizer, PdfExtraction, PdfExtractor, RejectionCode};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Everything one document run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub canonical: CanonicalText,
    pub detection: DetectionResult,
    pub obligations: ObligationResult,
    pub input_descriptor: InputDescriptor,
    pub output_hashes: OutputHashes,
}

/// Result of analysing input that may be refused before detection.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(Box<Analysis>),
    Rejected(RejectionCode),
}

impl AnalysisOutcome {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            AnalysisOutcome::Completed(analysis) => Some(analysis.as_ref()),
            AnalysisOutcome::Rejected(_) => None,
        }
    }
}

/// Canonicalize, detect, instantiate obligations, and optionally record.
///
/// Holds only immutable state, so one pipeline can serve many threads.
#[derive(Debug)]
pub struct Pipeline<C: Canonicalizer = StandardCanonicalizer> {
    registry: PatternRegistry,
    engine: ObligationEngine,
    canonicalizer: C,
    max_threads: usize,
}

impl Pipeline<StandardCanonicalizer> {
    /// Pipeline over the builtin ruleset and default engine.
    pub fn standard() -> Result<Self> {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let builtin = PatternRegistry::builtin()?;
        let disabled = &config.detection.disabled_patterns;
        if let Some(unknown) = disabled.iter().find(|id| builtin.get(id).is_none()) {
            return Err(PipelineError::UnknownPattern(unknown.clone()));
        }
        let registry = if disabled.is_empty() {
            builtin.clone()
        } else {
            let ids: Vec<&str> = disabled.iter().map(String::as_str).collect();
            builtin.without_ids(&ids)
        };

        let pipeline = Pipeline::new(
            registry,
            ObligationEngine::new(config.engine.clone())?,
            StandardCanonicalizer::new()?,
        )
        .with_max_threads(config.batch.max_threads);
        debug!(
            ruleset_version = pipeline.registry.version(),
            patterns = pipeline.registry.len(),
            proximity_window = config.engine.proximity_window,
            "pipeline configured"
        );
        Ok(pipeline)
    }
}

impl<C: Canonicalizer> Pipeline<C> {
    pub fn new(registry: PatternRegistry, engine: ObligationEngine, canonicalizer: C) -> Self {
        Self {
            registry,
            engine,
            canonicalizer,
            max_threads: 0,
        }
    }

    /// Cap batch workers; 0 uses available parallelism.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ObligationEngine {
        &self.engine
    }

    /// Versions and platform this pipeline stamps into ledger records.
    pub fn environment(&self) -> EnvironmentDescriptor {
        EnvironmentDescriptor::current(ENGINE_VERSION, self.registry.version())
    }

    pub fn analyze_text(&self, raw: &str) -> Result<Analysis> {
        self.analyze_canonical(self.canonicalizer.canonicalize(raw), InputFormat::Text)
    }

    /// Extract, then analyse. Extractor rejections, and extractions that
    /// canonicalize to nothing, come back as [`AnalysisOutcome::Rejected`].
    pub fn analyze_pdf(&self, bytes: &[u8], extractor: &dyn PdfExtractor) -> Result<AnalysisOutcome> {
        let (text, page_count) = match extractor.extract(bytes) {
            PdfExtraction::Extracted { text, page_count } => (text, page_count),
            PdfExtraction::Rejected(code) => {
                warn!(%code, bytes = bytes.len(), "pdf rejected by extractor");
                return Ok(AnalysisOutcome::Rejected(code));
            }
        };

        let canonical = self.canonicalizer.canonicalize(&text);
        if canonical.text.is_empty() {
            warn!(page_count, "pdf extraction produced no text");
            return Ok(AnalysisOutcome::Rejected(RejectionCode::Empty));
        }
        debug!(page_count, chars = canonical.text.chars().count(), "pdf extracted");
        let analysis = self.analyze_canonical(canonical, InputFormat::Pdf)?;
        Ok(AnalysisOutcome::Completed(Box::new(analysis)))
    }

    /// Analyse independent documents in parallel. Results keep input order.
    pub fn analyze_batch<T>(&self, documents: &[T]) -> Vec<Result<Analysis>>
    where
        T: AsRef<str> + Sync,
    {
        if documents.is_empty() {
            return Vec::new();
        }
        let workers = self.worker_count(documents.len());
        let chunk_size = documents.len().div_ceil(workers);
        debug!(documents = documents.len(), workers, "starting batch analysis");

        thread::scope(|scope| {
            let handles: Vec<_> = documents
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|doc| self.analyze_text(doc.as_ref()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(documents.chunks(chunk_size))
                .flat_map(|(handle, chunk)| match handle.join() {
                    Ok(results) => results,
                    Err(_) => chunk.iter().map(|_| Err(PipelineError::WorkerPanicked)).collect(),
                })
                .collect()
        })
    }

    /// Append a record of `analysis` to `ledger`.
    pub fn record<S: LedgerStorage>(
        &self,
        analysis: &Analysis,
        ledger: &mut LedgerHandle<S>,
    ) -> Result<TransactionRecord> {
        let record = ledger.append(
            analysis.input_descriptor.clone(),
            analysis.output_hashes.clone(),
            self.environment(),
        )?;
        Ok(record)
    }

    fn analyze_canonical(&self, canonical: CanonicalText, format: InputFormat) -> Result<Analysis> {
        let detection = detect(&canonical.text, &self.registry)?;
        let obligations = self.engine.instantiate(&detection.matches);

        let output_hashes = OutputHashes {
            detection_hash: detection.digest()?,
            obligation_hash: obligations.digest()?,
        };
        let input_descriptor =
            InputDescriptor::new(canonical.hash.clone(), canonical.text.chars().count(), format);

        info!(
            input_hash = %input_descriptor.hash,
            format = %format,
            matches = detection.matches.len(),
            obligations = obligations.obligation_count,
            open = obligations.status_summary.open,
            "analysis complete"
        );

        Ok(Analysis {
            canonical,
            detection,
            obligations,
            input_descriptor,
            output_hashes,
        })
    }

    fn worker_count(&self, documents: usize) -> usize {
        let limit = match self.max_threads {
            0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        };
        limit.clamp(1, documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::IdentityCanonicalizer;
    use obligo_types::change_fingerprint;

    fn pipeline() -> Pipeline {
        Pipeline::standard().unwrap()
    }

    #[test]
    fn text_analysis_hashes_canonical_text() {
        let analysis = pipeline().analyze_text("Users  must register.\r\n").unwrap();
        assert_eq!(analysis.canonical.text, "Users must register.");
        assert_eq!(analysis.input_descriptor.hash, change_fingerprint("Users must register."));
        assert_eq!(analysis.detection.input_hash, analysis.input_descriptor.hash);
        assert_eq!(analysis.input_descriptor.length, 20);
        assert_eq!(analysis.input_descriptor.format, InputFormat::Text);
        assert_eq!(analysis.output_hashes.detection_hash, analysis.detection.digest().unwrap());
    }

    #[test]
    fn unknown_disabled_pattern_is_rejected() {
        let mut config = PipelineConfig::default();
        config.detection.disabled_patterns = vec!["req.nonexistent".into()];
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(PipelineError::UnknownPattern(id)) if id == "req.nonexistent"
        ));
    }

    #[test]
    fn disabled_patterns_filter_the_ruleset() {
        let mut config = PipelineConfig::default();
        config.detection.disabled_patterns = vec!["req.must".into()];
        let pipeline = Pipeline::from_config(&config).unwrap();
        assert!(pipeline.registry().version().ends_with("+filtered"));
        let analysis = pipeline.analyze_text("Users must register.").unwrap();
        assert!(analysis.detection.matches.iter().all(|m| m.pattern_id != "req.must"));
    }

    #[test]
    fn extractor_rejection_is_forwarded() {
        let extractor = |_: &[u8]| PdfExtraction::Rejected(RejectionCode::ScannedSuspect);
        let outcome = pipeline().analyze_pdf(b"%PDF-1.7", &extractor).unwrap();
        assert_eq!(outcome, AnalysisOutcome::Rejected(RejectionCode::ScannedSuspect));
    }

    #[test]
    fn blank_extraction_is_rejected_as_empty() {
        let extractor = |_: &[u8]| PdfExtraction::Extracted {
            text: " \n 1 \n\n".into(),
            page_count: 1,
        };
        let outcome = pipeline().analyze_pdf(b"%PDF-1.7", &extractor).unwrap();
        assert_eq!(outcome, AnalysisOutcome::Rejected(RejectionCode::Empty));
    }

    #[test]
    fn extracted_pdf_is_analysed_as_pdf() {
        let extractor = |_: &[u8]| PdfExtraction::Extracted {
            text: "Identification must be submitted.\nPage 1 of 1".into(),
            page_count: 1,
        };
        let outcome = pipeline().analyze_pdf(b"%PDF-1.7", &extractor).unwrap();
        let analysis = outcome.analysis().unwrap();
        assert_eq!(analysis.input_descriptor.format, InputFormat::Pdf);
        assert_eq!(analysis.canonical.text, "Identification must be submitted.");
        assert_eq!(analysis.obligations.obligation_count, 1);
    }

    #[test]
    fn batch_preserves_input_order() {
        let docs = vec![
            "Users must register.".to_string(),
            "asdf qwer zxcv lkjh".to_string(),
            "\"Data\" means information.".to_string(),
            String::new(),
            "Because it matters, providers should comply.".to_string(),
        ];
        let pipeline = pipeline().with_max_threads(2);
        let batch: Vec<Analysis> = pipeline
            .analyze_batch(&docs)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        let sequential: Vec<Analysis> = docs.iter().map(|d| pipeline.analyze_text(d).unwrap()).collect();
        assert_eq!(batch, sequential);
        assert!(pipeline.analyze_batch::<String>(&[]).is_empty());
    }

    #[test]
    fn custom_canonicalizer_is_used() {
        let p = Pipeline::new(
            PatternRegistry::v1().unwrap(),
            ObligationEngine::v1().unwrap(),
            IdentityCanonicalizer,
        );
        let analysis = p.analyze_text("  must  ").unwrap();
        assert_eq!(analysis.canonical.text, "  must  ");
        assert_eq!(analysis.detection.matches[0].char_start, 2);
    }

    #[test]
    fn recording_chains_analyses() {
        let pipeline = pipeline();
        let mut ledger = LedgerHandle::in_memory();
        let a = pipeline.analyze_text("Users must register.").unwrap();
        let b = pipeline.analyze_text("Providers shall comply.").unwrap();
        let ra = pipeline.record(&a, &mut ledger).unwrap();
        let rb = pipeline.record(&b, &mut ledger).unwrap();
        assert_eq!(rb.previous_hash(), ra.transaction_hash());
        assert_eq!(ra.output_hashes, a.output_hashes);
        assert_eq!(ra.environment_descriptor.engine_version, ENGINE_VERSION);
        assert!(ledger.verify().unwrap().valid);
    }
}
