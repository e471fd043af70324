use crate::error::Result;
use crate::input::DomainSource;
use crate::lookup::{WhoisClient, WhoisLookup};
use crate::output::{self, RotatingSink};
use crate::types::{DomainRecord, ScanConfig, ScanError, ScanStats};
use crate::utils::scan_date;
use log::{debug, error, info, warn};
use std::time::Instant;

/// Runs one scan: domain list in, rotated NDJSON files out.
pub struct ScanEngine {
    config: ScanConfig,
    lookup: Box<dyn WhoisLookup>,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let lookup = WhoisClient::new(&config.lookup)?;
        Ok(Self::with_lookup(config, Box::new(lookup)))
    }

    pub fn with_lookup(config: ScanConfig, lookup: Box<dyn WhoisLookup>) -> Self {
        Self { config, lookup }
    }

    /// Scans every domain once, stopping at the first failure. The output
    /// file is closed before any error is returned.
    pub async fn run(&self) -> Result<ScanStats> {
        let settings = &self.config.output;
        let start_index =
            output::next_start_index(&settings.dir, &settings.base_name, &settings.extension)?;
        let mut source =
            DomainSource::open(&self.config.domain_input, self.config.skip_blank_lines)?;
        let mut sink = RotatingSink::from_config(settings, start_index)?;

        info!(
            "Starting scan of {} into {} (size limit {} bytes)",
            self.config.domain_input.display(),
            output::file_name(&settings.base_name, &settings.extension, start_index),
            settings.size_limit
        );

        let start_time = Instant::now();
        let mut stats = ScanStats {
            domains_read: 0,
            records_written: 0,
            first_index: start_index,
            last_index: start_index,
            duration: Default::default(),
        };

        let outcome = self.scan(&mut source, &mut sink, &mut stats).await;
        stats.last_index = sink.current_index();
        stats.duration = start_time.elapsed();

        match outcome {
            Ok(()) => {
                sink.close()?;
                Ok(stats)
            }
            Err(e) => {
                if matches!(e, ScanError::Transport { .. }) {
                    if let Err(cleanup) = sink.discard_if_unused() {
                        error!("{}", cleanup);
                    }
                }
                if let Err(close) = sink.close() {
                    error!("{}", close);
                }
                Err(e)
            }
        }
    }

    async fn scan(
        &self,
        source: &mut DomainSource,
        sink: &mut RotatingSink,
        stats: &mut ScanStats,
    ) -> Result<()> {
        loop {
            let domain = match source.next_domain()? {
                Some(domain) => domain,
                None => {
                    info!("Reached end of domain file after {} lines", source.line_no());
                    return Ok(());
                }
            };
            stats.domains_read += 1;

            let response = match self.lookup.lookup(&domain).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Aborting scan at line {} ({:?})", source.line_no(), domain);
                    return Err(e);
                }
            };

            let record = DomainRecord::new(domain, scan_date(), response);
            let line = serde_json::to_vec(&record)?;
            sink.write(&line)?;
            stats.records_written += 1;
            debug!("Wrote record for {} to index {}", record.domain, sink.current_index());
        }
    }
}
