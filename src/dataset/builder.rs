use std::fs;
use std::path::Path;
use anyhow::Error;
use log::{debug, info, warn};
use crate::config::config::DatasetConfig;
use crate::dataset::dataset::{Dataset, LabeledSample};
use crate::features::features::{normalize, NUM_LANDMARKS};
use crate::modules::hand_landmarker::HandLandmarker;
use crate::utils::image::load_rgb_image;

/// DatasetBuilder walks a `root/<user>/<letter>/<image>` tree, runs the
/// hand-landmark detector on every image, and collects one labeled feature
/// vector per detected 21-point hand.
pub struct DatasetBuilder<D: HandLandmarker> {
    landmarker: D,
    config: DatasetConfig,
}

impl<D: HandLandmarker> DatasetBuilder<D> {
    /// new initializes a builder around an external landmark detector.
    pub fn new(landmarker: D, config: DatasetConfig) -> Self {
        DatasetBuilder { landmarker, config }
    }

    /// build walks the configured data directory and returns the collected
    /// dataset.
    ///
    /// Images where no hand is detected, and detected hands whose landmark
    /// count is not exactly 21, are skipped without failing the build. Images
    /// with several detected hands contribute one sample per hand. I/O and
    /// decode failures are fatal: this is an operator-run batch job.
    ///
    /// # Returns
    /// * `Result<Dataset, Error>`
    pub fn build(&mut self) -> Result<Dataset, Error> {
        let root = self.config.data_dir.clone();
        let mut dataset = Dataset::new();

        for user_dir in sorted_entries(&root)? {
            if !user_dir.path().is_dir() {
                continue;
            }
            let user = match user_dir.file_name().into_string() {
                Ok(user) => user,
                Err(name) => {
                    warn!("dataset_builder - skipping non-utf8 user directory {:?}", name);
                    continue;
                }
            };
            info!("processing user: {}", user);

            for letter_dir in sorted_entries(&user_dir.path())? {
                if !letter_dir.path().is_dir() {
                    continue;
                }
                let label = match letter_dir.file_name().into_string() {
                    Ok(label) => label,
                    Err(name) => {
                        warn!("dataset_builder - skipping non-utf8 letter directory {:?}", name);
                        continue;
                    }
                };
                info!("processing letter: {}", label);

                for image_entry in sorted_entries(&letter_dir.path())? {
                    let image_path = image_entry.path();
                    if !image_path.is_file() {
                        continue;
                    }
                    let img = load_rgb_image(&image_path)?;
                    let hands = self.landmarker.detect(&img)?;
                    if hands.is_empty() {
                        debug!("no hand detected in {:?}", image_path);
                        continue;
                    }

                    for hand in hands {
                        if hand.points.len() != NUM_LANDMARKS {
                            debug!(
                                "skipping hand with {} landmarks in {:?}",
                                hand.points.len(),
                                image_path
                            );
                            continue;
                        }
                        let features = normalize(&hand.points)?;
                        dataset.push(LabeledSample {
                            features,
                            label: label.clone(),
                            user: user.clone(),
                        });
                    }
                }
            }
        }

        let summary = dataset.summary();
        info!("total samples collected: {}", summary.total_samples);
        info!("unique users: {}", summary.unique_users);
        info!("unique labels: {}", summary.unique_labels);

        Ok(dataset)
    }
}

fn sorted_entries(path: &Path) -> Result<Vec<fs::DirEntry>, Error> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        entries.push(entry?);
    }
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}
