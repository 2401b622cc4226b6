use std::io;

use serde::Deserialize;

use crate::core::{PostcodeStats, PricePoints};

/// One row of the postcode dataset. Sales prices are in thousands; blank or
/// unparseable cells read as no data.
#[derive(Clone, Debug, Deserialize)]
pub struct PostcodeRow {
    postcode: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    median_rent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    q1_rent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    q3_rent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    median_sales_price: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    q1_sales_price: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    q3_sales_price: Option<f64>,
}

impl From<PostcodeRow> for PostcodeStats {
    fn from(row: PostcodeRow) -> Self {
        PostcodeStats {
            postcode: row.postcode,
            weekly_rent: PricePoints {
                q1: row.q1_rent,
                median: row.median_rent,
                q3: row.q3_rent,
            },
            sales_price_thousands: PricePoints {
                q1: row.q1_sales_price,
                median: row.median_sales_price,
                q3: row.q3_sales_price,
            },
        }
    }
}

pub fn read_postcodes<R: io::Read>(reader: R) -> Result<Vec<PostcodeStats>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize::<PostcodeRow>()
        .map(|row| row.map(PostcodeStats::from))
        .collect()
}
