use std::fs;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use super::{Result, extract_data_entry_from_zip};

const GEONAMES_DUMP_URL: &str = "https://download.geonames.org/export/dump";
const ADMIN1_CODES_FILE: &str = "admin1CodesASCII.txt";

/// Which GeoNames dump to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoNamesSource {
    /// Every feature in the database (large).
    AllCountries,
    /// Cities with more than 15000 inhabitants.
    #[default]
    Cities15000,
    Cities5000,
    Cities1000,
    Cities500,
}

impl GeoNamesSource {
    #[must_use]
    pub const fn archive_name(self) -> &'static str {
        match self {
            Self::AllCountries => "allCountries.zip",
            Self::Cities15000 => "cities15000.zip",
            Self::Cities5000 => "cities5000.zip",
            Self::Cities1000 => "cities1000.zip",
            Self::Cities500 => "cities500.zip",
        }
    }

    #[must_use]
    pub fn url(self) -> String {
        format!("{GEONAMES_DUMP_URL}/{}", self.archive_name())
    }
}

/// Files written by [`download_geonames`].
#[derive(Debug, Clone)]
pub struct DownloadedFiles {
    pub dump: PathBuf,
    pub admin1_codes: PathBuf,
}

/// Download a GeoNames dump plus the admin1 code table into `dest`.
///
/// The dump is extracted from its archive, so `dump` points at a plain `.txt` file.
#[instrument(name = "Download GeoNames", skip_all, fields(source = ?source), level = "info")]
pub fn download_geonames(dest: &Path, source: GeoNamesSource) -> Result<DownloadedFiles> {
    fs::create_dir_all(dest)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let client = Client::new();
        let admin1_url = format!("{GEONAMES_DUMP_URL}/{ADMIN1_CODES_FILE}");

        let (dump_file, admin1_file) = tokio::try_join!(
            download_zip_and_extract(&client, &source.url()),
            download_to_temp_file(&client, &admin1_url),
        )?;

        let dump = dest.join(source.archive_name().replace(".zip", ".txt"));
        let admin1_codes = dest.join(ADMIN1_CODES_FILE);
        fs::copy(dump_file.path(), &dump)?;
        fs::copy(admin1_file.path(), &admin1_codes)?;
        info!(dump = ?dump, admin1_codes = ?admin1_codes, "GeoNames files ready");

        Ok(DownloadedFiles { dump, admin1_codes })
    })
}

async fn download_to_temp_file(client: &Client, url: &str) -> Result<NamedTempFile> {
    info!(url, "Starting download");
    let response = client.get(url).send().await?.error_for_status()?;
    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
         {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("█░"));
    }
    pb.set_message(format!(
        "Downloading {}",
        url.rsplit('/').next().unwrap_or(url)
    ));

    let temp_file = NamedTempFile::new()?;
    let mut dest_file = tokio::fs::File::create(temp_file.path()).await?;

    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        dest_file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    dest_file.flush().await?;
    pb.finish_and_clear();
    Ok(temp_file)
}

async fn download_zip_and_extract(client: &Client, zip_url: &str) -> Result<NamedTempFile> {
    let zip_temp_file = download_to_temp_file(client, zip_url).await?;
    info!(path = ?zip_temp_file.path(), "ZIP download complete");

    let zip_file_path = zip_temp_file.path().to_path_buf();
    // keep the archive alive until extraction is done
    let extracted =
        tokio::task::spawn_blocking(move || extract_data_entry_from_zip(&zip_file_path)).await??;
    drop(zip_temp_file);
    Ok(extracted)
}
