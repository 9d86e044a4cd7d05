use crate::{Result, error};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use snafu::ResultExt;
use std::path::Path;
use xz2::read::XzDecoder;

/// How a downloaded artifact is turned into the contents of a version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactFormat {
    Tar,
    TarGz,
    TarXz,
    TarZst,
    TarBz2,
    Zip,
    /// Not an archive; copied as-is.
    Plain,
}

impl ArtifactFormat {
    /// Recognized file name suffixes, longest first so that `.tar.gz` wins over `.gz`-less `.tar`.
    const SUFFIXES: &'static [(&'static str, ArtifactFormat)] = &[
        (".tar.gz", Self::TarGz),
        (".tar.xz", Self::TarXz),
        (".tar.zst", Self::TarZst),
        (".tar.bz2", Self::TarBz2),
        (".tbz2", Self::TarBz2),
        (".tgz", Self::TarGz),
        (".txz", Self::TarXz),
        (".tar", Self::Tar),
        (".zip", Self::Zip),
    ];

    /// Detect the format from the artifact's file name, case-insensitively.
    pub(crate) fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, format)| *format)
            .unwrap_or(Self::Plain)
    }
}

/// Unpack (or copy) the artifact at `artifact_path` into `dest_dir`.
pub(crate) fn extract_artifact(artifact_path: &Path, dest_dir: &Path) -> Result<()> {
    let file_name = artifact_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ArtifactFormat::from_file_name(&file_name);

    tracing::debug!(
        "Extracting {} as {:?} into {}",
        artifact_path.display(),
        format,
        dest_dir.display()
    );

    std::fs::create_dir_all(dest_dir).with_context(|_| error::IoSnafu {
        path: dest_dir.to_path_buf(),
    })?;

    match format {
        ArtifactFormat::Tar => extract_tar_archive(open(artifact_path)?, artifact_path, dest_dir),
        ArtifactFormat::TarGz => {
            extract_tar_archive(GzDecoder::new(open(artifact_path)?), artifact_path, dest_dir)
        }
        ArtifactFormat::TarXz => {
            extract_tar_archive(XzDecoder::new(open(artifact_path)?), artifact_path, dest_dir)
        }
        ArtifactFormat::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(open(artifact_path)?)
                .map_err(|e| extraction_failed(artifact_path, e))?;
            extract_tar_archive(decoder, artifact_path, dest_dir)
        }
        ArtifactFormat::TarBz2 => {
            extract_tar_archive(BzDecoder::new(open(artifact_path)?), artifact_path, dest_dir)
        }
        ArtifactFormat::Zip => extract_zip(artifact_path, dest_dir),
        ArtifactFormat::Plain => copy_plain(artifact_path, &file_name, dest_dir),
    }
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).with_context(|_| error::IoSnafu {
        path: path.to_path_buf(),
    })
}

fn extraction_failed<E>(path: &Path, e: E) -> error::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    error::Error::ArchiveExtractionFailed {
        path: path.to_path_buf(),
        source: Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
    }
}

fn extract_tar_archive<R: std::io::Read>(reader: R, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    archive
        .unpack(dest_dir)
        .map_err(|e| extraction_failed(archive_path, e))
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let mut archive =
        zip::ZipArchive::new(open(archive_path)?).map_err(|e| extraction_failed(archive_path, e))?;

    archive
        .extract(dest_dir)
        .map_err(|e| extraction_failed(archive_path, e))
}

fn copy_plain(artifact_path: &Path, file_name: &str, dest_dir: &Path) -> Result<()> {
    let dest_path = dest_dir.join(file_name);

    std::fs::copy(artifact_path, &dest_path).with_context(|_| error::IoSnafu { path: dest_path })?;

    Ok(())
}

/// Archive builders shared by the provider tests.
#[cfg(test)]
pub(crate) mod testdata {
    use std::io::Write;

    /// A gzipped tarball holding the given files.
    pub(crate) fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, contents.as_bytes()).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    /// A zip archive holding the given files.
    pub(crate) fn zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        for (path, contents) in files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }
}
