//! PPTX Assembly (§4.4 sub-step): a hand-written, minimal-but-valid OOXML
//! presentation container — 16:9 slides, one blank-layout slide per still,
//! each filled edge-to-edge by its image. Mirrors the structure the
//! original system produced via `python-pptx`'s
//! `prs.slide_width = Inches(16)` / `add_picture(..., width=slide_width,
//! height=slide_height)` recipe, reimplemented as a raw zip of XML parts
//! since this workspace carries no OOXML-authoring crate.

use crate::CapturedStill;
use quick_xml::escape::escape;
use slide_extract_common::{ProcessingError, Result};
use std::io::Write as _;
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

/// EMU (English Metric Units) per inch, the unit OOXML measures shapes in.
const EMU_PER_INCH: i64 = 914_400;
const SLIDE_WIDTH_EMU: i64 = 16 * EMU_PER_INCH;
const SLIDE_HEIGHT_EMU: i64 = 9 * EMU_PER_INCH;

/// Builds a PPTX at `output_path` with one full-bleed slide per still in
/// `stills`, in the order given (callers pass them already timestamp-sorted).
///
/// # Errors
/// Returns [`ProcessingError::IoError`] if the container cannot be written,
/// or [`ProcessingError::Other`] if a still's image file cannot be read.
pub fn build_pptx(stills: &[CapturedStill], output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<()> = FileOptions::default();

    zip.start_file("[Content_Types].xml", options)
        .map_err(zip_err)?;
    zip.write_all(content_types_xml(stills.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options).map_err(zip_err)?;
    zip.write_all(ROOT_RELS_XML.as_bytes())?;

    zip.start_file("ppt/presentation.xml", options)
        .map_err(zip_err)?;
    zip.write_all(presentation_xml(stills.len()).as_bytes())?;

    zip.start_file("ppt/_rels/presentation.xml.rels", options)
        .map_err(zip_err)?;
    zip.write_all(presentation_rels_xml(stills.len()).as_bytes())?;

    zip.start_file("ppt/slideMasters/slideMaster1.xml", options)
        .map_err(zip_err)?;
    zip.write_all(SLIDE_MASTER_XML.as_bytes())?;

    zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)
        .map_err(zip_err)?;
    zip.write_all(SLIDE_MASTER_RELS_XML.as_bytes())?;

    zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)
        .map_err(zip_err)?;
    zip.write_all(SLIDE_LAYOUT_XML.as_bytes())?;

    zip.start_file("ppt/slideLayouts/_rels/slideLayout1.xml.rels", options)
        .map_err(zip_err)?;
    zip.write_all(SLIDE_LAYOUT_RELS_XML.as_bytes())?;

    for (i, still) in stills.iter().enumerate() {
        let slide_num = i + 1;
        let image_bytes = std::fs::read(&still.path).map_err(|e| {
            ProcessingError::Other(format!(
                "failed to read captured still {}: {e}",
                still.path.display()
            ))
        })?;
        let image_ext = still
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpeg");

        zip.start_file(format!("ppt/media/image{slide_num}.{image_ext}"), options)
            .map_err(zip_err)?;
        zip.write_all(&image_bytes)?;

        zip.start_file(format!("ppt/slides/slide{slide_num}.xml"), options)
            .map_err(zip_err)?;
        zip.write_all(slide_xml().as_bytes())?;

        zip.start_file(
            format!("ppt/slides/_rels/slide{slide_num}.xml.rels"),
            options,
        )
        .map_err(zip_err)?;
        zip.write_all(slide_rels_xml(slide_num, image_ext).as_bytes())?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

fn zip_err(e: zip::result::ZipError) -> ProcessingError {
    ProcessingError::Other(format!("pptx container write failed: {e}"))
}

fn content_types_xml(slide_count: usize) -> String {
    let mut overrides = String::new();
    for i in 1..=slide_count {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="jpeg" ContentType="image/jpeg"/>
<Default Extension="jpg" ContentType="image/jpeg"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
{overrides}
</Types>"#
    )
}

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#;

fn presentation_xml(slide_count: usize) -> String {
    let mut slide_id_list = String::new();
    for i in 0..slide_count {
        // Slide IDs must be >= 256 per the OOXML spec.
        let slide_id = 256 + i;
        let r_id = i + 2; // rId1 is the slide master relationship.
        slide_id_list.push_str(&format!(
            r#"<p:sldId id="{slide_id}" r:id="rId{r_id}"/>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
    xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
    xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst>{slide_id_list}</p:sldIdLst>
<p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}" type="screen16x9"/>
<p:notesSz cx="{SLIDE_HEIGHT_EMU}" cy="{SLIDE_WIDTH_EMU}"/>
</p:presentation>"#
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let mut rels = String::new();
    rels.push_str(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );
    for i in 0..slide_count {
        let slide_num = i + 1;
        let r_id = i + 2;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{r_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{slide_num}.xml"/>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
{rels}
</Relationships>"#
    )
}

const SLIDE_MASTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
    xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
    xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
</p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2"
    accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6"
    hlink="hlink" folHlink="folHlink"/>
<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>
</p:sldMaster>"#;

const SLIDE_MASTER_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
</Relationships>"#;

/// Blank layout (python-pptx's `slide_layouts[6]`) — an otherwise empty
/// shape tree, so the full-bleed picture is the only visible content.
const SLIDE_LAYOUT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
    xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
    xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"
    type="blank">
<p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
</p:spTree></p:cSld>
<p:clrMapOvr><a:overrideClrMapping bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1"
    accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6"
    hlink="hlink" folHlink="folHlink"/></p:clrMapOvr>
</p:sldLayout>"#;

const SLIDE_LAYOUT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#;

/// One slide: a single picture shape, positioned at the origin and sized to
/// exactly fill the slide, matching `add_picture(path, Inches(0), Inches(0),
/// width=slide_width, height=slide_height)`.
fn slide_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
    xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
    xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
<p:pic>
<p:nvPicPr>
<p:cNvPr id="2" name="{slide_picture_name}"/>
<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
<p:nvPr/>
</p:nvPicPr>
<p:blipFill><a:blip r:embed="rId1"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>
<p:spPr>
<a:xfrm><a:off x="0" y="0"/><a:ext cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
</p:spPr>
</p:pic>
</p:spTree></p:cSld>
</p:sld>"#,
        slide_picture_name = escape("Slide Image"),
    )
}

fn slide_rels_xml(slide_num: usize, image_ext: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{slide_num}.{image_ext}"/>
</Relationships>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_test_jpeg(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        // Minimal content; the PPTX assembler never decodes the image, it
        // only copies bytes into the container.
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        path
    }

    #[test]
    fn test_build_pptx_writes_a_valid_zip() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = write_test_jpeg(dir.path(), "slide_0000_0.000s.jpg");
        let stills = vec![CapturedStill {
            index: 0,
            timestamp: 0.0,
            path: image_path,
        }];

        let output_path = dir.path().join("out.pptx");
        build_pptx(&stills, &output_path).unwrap();

        let file = std::fs::File::open(&output_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert!(archive.by_name("ppt/presentation.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide1.xml").is_ok());
        assert!(archive.by_name("ppt/media/image1.jpg").is_ok());
    }

    #[test]
    fn test_build_pptx_empty_deck() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("empty.pptx");
        build_pptx(&[], &output_path).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_content_types_includes_one_override_per_slide() {
        let xml = content_types_xml(3);
        assert_eq!(xml.matches("PartName=\"/ppt/slides/slide").count(), 3);
    }
}
