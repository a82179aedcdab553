//! Calibration coefficient files.
//!
//! One CSV per country, source and carrier. Rows are coefficients, columns
//! are calibration years:
//!
//! ```text
//! coefficient,2015,2016
//! alpha,0.81,0.84
//! beta,0.52,0.47
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use energy_common::{european_countries, Carrier, ClimateSource, Country, DataPaths};
use tracing::{debug, info, warn};

use crate::error::{CalibrationError, CalibrationResult};
use crate::reference::InstalledCapacity;

/// Coefficients of one country for every calibration year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefficientTable {
    names: Vec<String>,
    years: BTreeMap<i32, Vec<f64>>,
}

impl CoefficientTable {
    pub fn load_csv(path: &Path) -> CalibrationResult<Self> {
        let bad = |reason: String| CalibrationError::invalid_table(path.display().to_string(), reason);
        let mut reader = csv::Reader::from_reader(File::open(path)?);

        let headers = reader.headers()?.clone();
        let mut year_columns = Vec::new();
        for header in headers.iter().skip(1) {
            let year: i32 = header
                .trim()
                .parse()
                .map_err(|_| bad(format!("column '{header}' is not a year")))?;
            year_columns.push(year);
        }

        let mut table = Self::default();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); year_columns.len()];
        for record in reader.records() {
            let record = record?;
            let name = record.get(0).unwrap_or_default().trim().to_string();
            for (c, column) in columns.iter_mut().enumerate() {
                let field = record.get(c + 1).unwrap_or_default().trim();
                let value = if field.is_empty() {
                    f64::NAN
                } else {
                    field
                        .parse()
                        .map_err(|_| bad(format!("'{name}' has non-numeric value '{field}'")))?
                };
                column.push(value);
            }
            table.names.push(name);
        }
        table.years = year_columns.into_iter().zip(columns).collect();
        Ok(table)
    }

    pub fn save_csv(&self, path: &Path) -> CalibrationResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["coefficient".to_string()];
        header.extend(self.years.keys().map(|y| y.to_string()));
        writer.write_record(&header)?;

        for (row, name) in self.names.iter().enumerate() {
            let mut record = vec![name.clone()];
            record.extend(self.years.values().map(|values| values[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn get(&self, year: i32) -> Option<&[f64]> {
        self.years.get(&year).map(Vec::as_slice)
    }

    /// Add the coefficients of `year`. Returns `false` (and changes nothing)
    /// when the year is already present.
    pub fn insert_year(&mut self, year: i32, names: &[String], values: &[f64]) -> CalibrationResult<bool> {
        if self.years.contains_key(&year) {
            return Ok(false);
        }
        if names.len() != values.len() {
            return Err(CalibrationError::Fit(format!(
                "{} coefficient names for {} values",
                names.len(),
                values.len()
            )));
        }

        if self.years.is_empty() {
            self.names = names.to_vec();
        }
        // align on the existing rows; new names become new rows
        for name in names {
            if !self.names.contains(name) {
                self.names.push(name.clone());
                for column in self.years.values_mut() {
                    column.push(f64::NAN);
                }
            }
        }
        let column = self
            .names
            .iter()
            .map(|name| {
                names
                    .iter()
                    .position(|n| n == name)
                    .map_or(f64::NAN, |k| values[k])
            })
            .collect();
        self.years.insert(year, column);
        Ok(true)
    }

    /// Average over the years, weighted by `weight(year)`.
    ///
    /// Years without a weight count as zero. When no year has a positive
    /// weight, every year counts equally.
    pub fn weighted_average<W>(&self, weight: W) -> Option<Vec<f64>>
    where
        W: Fn(i32) -> Option<f64>,
    {
        if self.years.is_empty() {
            return None;
        }
        let mut weights: Vec<(i32, f64)> = self
            .years
            .keys()
            .map(|&y| (y, weight(y).filter(|w| w.is_finite() && *w > 0.0).unwrap_or(0.0)))
            .collect();
        if weights.iter().all(|(_, w)| *w == 0.0) {
            weights.iter_mut().for_each(|(_, w)| *w = 1.0);
        }

        let average = (0..self.names.len())
            .map(|row| {
                let (sum, total) = weights.iter().fold((0.0, 0.0), |(sum, total), (year, w)| {
                    let value = self.years[year][row];
                    if value.is_finite() {
                        (sum + value * w, total + w)
                    } else {
                        (sum, total)
                    }
                });
                if total > 0.0 {
                    sum / total
                } else {
                    f64::NAN
                }
            })
            .collect();
        Some(average)
    }
}

/// Averaged coefficients ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    pub names: Vec<String>,
    pub values: Vec<f64>,
    /// Country whose file the values came from; `None` when averaged over
    /// other countries.
    pub country: Option<String>,
}

/// Coefficient files of one climate source.
pub struct CoefficientStore<'a> {
    paths: &'a DataPaths,
    source: &'a ClimateSource,
    capacity: &'a InstalledCapacity,
}

impl<'a> CoefficientStore<'a> {
    pub fn new(paths: &'a DataPaths, source: &'a ClimateSource, capacity: &'a InstalledCapacity) -> Self {
        Self { paths, source, capacity }
    }

    /// Record the coefficients fitted for `year`. A year already present in
    /// the file is left as it is and `false` is returned.
    pub fn save(
        &self,
        country: &Country,
        carrier: Carrier,
        year: i32,
        names: &[String],
        values: &[f64],
    ) -> CalibrationResult<bool> {
        let path = self.paths.coefficients_file(country, self.source, carrier)?;
        let mut table = if path.exists() {
            CoefficientTable::load_csv(&path)?
        } else {
            CoefficientTable::default()
        };

        if !table.insert_year(year, names, values)? {
            info!(country = country.iso_alpha2, carrier = %carrier, year, "Coefficients already saved");
            return Ok(false);
        }
        table.save_csv(&path)?;
        info!(path = %path.display(), year, "Saved calibration coefficients");
        Ok(true)
    }

    /// Capacity-weighted average over the years of a country's file.
    fn country_average(&self, country: &Country, carrier: Carrier) -> CalibrationResult<Option<(Vec<String>, Vec<f64>, i32)>> {
        let path = self.paths.coefficients_file(country, self.source, carrier)?;
        if !path.exists() {
            return Ok(None);
        }
        let table = CoefficientTable::load_csv(&path)?;
        let resource = carrier.resource_type();
        let Some(values) =
            table.weighted_average(|year| self.capacity.get(country.iso_alpha2, resource, year))
        else {
            return Ok(None);
        };
        let last_year = table.years().last().unwrap_or_default();
        Ok(Some((table.names().to_vec(), values, last_year)))
    }

    /// Coefficients of `country`, or, when it has none, the average of the
    /// other countries weighted by their installed capacity in their last
    /// calibration year.
    pub fn read(&self, country: &Country, carrier: Carrier) -> CalibrationResult<Coefficients> {
        if let Some((names, values, _)) = self.country_average(country, carrier)? {
            debug!(country = country.iso_alpha2, carrier = %carrier, ?values, "Read calibration coefficients");
            return Ok(Coefficients {
                names,
                values,
                country: Some(country.iso_alpha2.to_string()),
            });
        }

        let resource = carrier.resource_type();
        let mut names: Option<Vec<String>> = None;
        let mut sums: Vec<f64> = Vec::new();
        let mut total_weight = 0.0;
        let mut contributors = 0;

        for other in european_countries().iter().filter(|c| c.iso_alpha2 != country.iso_alpha2) {
            let Some((other_names, values, last_year)) = self.country_average(other, carrier)? else {
                continue;
            };
            let weight = self
                .capacity
                .get(other.iso_alpha2, resource, last_year)
                .filter(|w| w.is_finite() && *w > 0.0);
            let Some(weight) = weight else {
                warn!(country = other.iso_alpha2, year = last_year, "No installed capacity, skipping coefficients");
                continue;
            };
            match &names {
                None => {
                    sums = values.iter().map(|v| v * weight).collect();
                    names = Some(other_names);
                }
                Some(existing) if *existing == other_names => {
                    sums.iter_mut().zip(&values).for_each(|(s, v)| *s += v * weight);
                }
                Some(_) => {
                    warn!(country = other.iso_alpha2, "Coefficient names differ, skipping");
                    continue;
                }
            }
            total_weight += weight;
            contributors += 1;
        }

        match names {
            Some(names) if total_weight > 0.0 => {
                info!(country = country.iso_alpha2, carrier = %carrier, contributors, "Using coefficients averaged over other countries");
                Ok(Coefficients {
                    names,
                    values: sums.iter().map(|s| s / total_weight).collect(),
                    country: None,
                })
            }
            _ => Err(CalibrationError::MissingCoefficients(format!(
                "{} {}",
                country.iso_alpha2, carrier
            ))),
        }
    }
}
