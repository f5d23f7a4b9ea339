use serde::Deserialize;

use crate::error::Result;

/// Where the cars dataset lives.
pub const CARS_DATA_URL: &str = "https://storage.googleapis.com/tfjs-tutorials/carsData.json";

/// One horsepower/mpg observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub horsepower: f32,
    pub mpg: f32,
}

/// The raw dataset row. Fields beyond the two we project are ignored.
#[derive(Debug, Deserialize)]
struct CarRecord {
    #[serde(rename = "Miles_per_Gallon", default)]
    miles_per_gallon: Option<f32>,
    #[serde(rename = "Horsepower", default)]
    horsepower: Option<f32>,
}

/// Parses the raw dataset payload, keeping only records where both columns
/// are present. Values are not validated beyond presence.
///
/// # Arguments
/// * `payload` - The JSON array of car records.
///
/// # Returns
/// The filtered samples, or `Format` if the payload is not parseable.
pub fn parse_cars(payload: &str) -> Result<Vec<Sample>> {
    let records: Vec<CarRecord> = serde_json::from_str(payload)?;

    let samples = records
        .into_iter()
        .filter_map(|r| match (r.horsepower, r.miles_per_gallon) {
            (Some(horsepower), Some(mpg)) => Some(Sample { horsepower, mpg }),
            _ => None,
        })
        .collect();

    Ok(samples)
}

/// Fetches the remote cars dataset and filters out unusable records.
///
/// # Arguments
/// * `client` - The HTTP client to fetch with.
///
/// # Returns
/// The filtered samples; `Http` if the fetch does not resolve, `Format` if
/// the payload is not parseable.
pub async fn fetch_cars(client: &reqwest::Client) -> Result<Vec<Sample>> {
    log::info!("fetching dataset from {CARS_DATA_URL}");

    let payload = client
        .get(CARS_DATA_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let samples = parse_cars(&payload)?;
    log::info!("loaded {} usable samples", samples.len());

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineErr;

    #[test]
    fn filters_records_with_missing_columns() {
        let payload = r#"[
            {"Name": "ok", "Miles_per_Gallon": 18, "Horsepower": 130, "Cylinders": 8},
            {"Name": "null mpg", "Miles_per_Gallon": null, "Horsepower": 165},
            {"Name": "absent hp", "Miles_per_Gallon": 24},
            {"Name": "null hp", "Miles_per_Gallon": 27, "Horsepower": null},
            {"Name": "also ok", "Miles_per_Gallon": 31, "Horsepower": 65}
        ]"#;

        let samples = parse_cars(payload).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample {
                    horsepower: 130.0,
                    mpg: 18.0
                },
                Sample {
                    horsepower: 65.0,
                    mpg: 31.0
                },
            ]
        );
    }

    #[test]
    fn implausible_values_pass_through() {
        // Presence is the only filter; range checking is not the loader's job.
        let payload = r#"[{"Miles_per_Gallon": -1, "Horsepower": 0}]"#;
        let samples = parse_cars(payload).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn garbage_payload_is_a_format_error() {
        let err = parse_cars("<html>not json</html>").unwrap_err();
        assert!(matches!(err, PipelineErr::Format(_)));
    }
}
