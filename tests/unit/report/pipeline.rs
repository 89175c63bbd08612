use ndarray::Array3;
use nifti::NiftiType;

use super::*;
use crate::figure::backend::FigureView;
use crate::foundation::error::QcError;
use crate::volume::nifti_io::Volume;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ctqc_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Fails on the `fail_at`-th composition (0-based), succeeds otherwise.
struct Counter {
    calls: usize,
    fail_at: Option<usize>,
}

impl Compositor for Counter {
    fn compose(&mut self, _view: &FigureView) -> QcResult<String> {
        let n = self.calls;
        self.calls += 1;
        if self.fail_at == Some(n) {
            return Err(QcError::render("stub failure"));
        }
        Ok(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#.to_string())
    }
}

fn write(path: &Path, data: Array3<f32>, dtype: NiftiType) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    Volume::write_new(path, data, [1.0; 3], dtype).unwrap();
}

/// Subject `sub-01` with an SST and the visits in `sessions`.
fn subject_tree(root: &Path, sessions: &[&str]) -> (PathBuf, PathBuf) {
    let n = 10;
    let inside = |v: usize| (2..8).contains(&v);
    let mask = Array3::from_shape_fn((n, n, n), |(x, y, z)| {
        if inside(x) && inside(y) && inside(z) { 1.0 } else { 0.0 }
    });
    let seg = mask.mapv(|v| if v > 0.0 { 2.0 } else { 0.0 });
    let anat = Array3::from_shape_fn((n, n, n), |(x, y, z)| (x + 2 * y + 3 * z) as f32);

    let subject_dir = root.join("sub-01");
    let template_dir = root.join("template");
    let sst = subject_dir.join("sub-01_CTSingleSubjectTemplate");
    for f in ["T_template0", "T_templateBrainNormalizedToTemplate", "T_templateBrainExtractionBrain"] {
        write(&sst.join(format!("{f}.nii.gz")), anat.clone(), NiftiType::Float32);
    }
    write(&sst.join("T_templateBrainExtractionMask.nii.gz"), mask.clone(), NiftiType::Uint8);
    write(&sst.join("T_templateBrainSegmentation.nii.gz"), seg.clone(), NiftiType::Uint8);
    write(&template_dir.join("template_brain.nii.gz"), anat.clone(), NiftiType::Float32);
    write(&template_dir.join("template_brain_mask.nii.gz"), mask.clone(), NiftiType::Uint8);

    for (i, ses) in sessions.iter().enumerate() {
        let base = format!("sub-01_{ses}_T1w");
        let visit = subject_dir.join(format!("{base}_{i}"));
        write(&subject_dir.join("coreg").join(format!("{base}.nii.gz")), anat.clone(), NiftiType::Float32);
        write(&visit.join(format!("{base}BrainExtractionMask.nii.gz")), mask.clone(), NiftiType::Uint8);
        write(&visit.join(format!("{base}BrainSegmentation.nii.gz")), seg.clone(), NiftiType::Uint8);
        write(&visit.join(format!("{base}BrainNormalizedToTemplate.nii.gz")), anat.clone(), NiftiType::Float32);
    }
    (subject_dir, template_dir)
}

#[test]
fn figures_follow_fixed_order() {
    let root = temp_dir("pipeline_order");
    let (subject_dir, template_dir) = subject_tree(&root, &["ses-01", "ses-02"]);
    let request = ReportRequest::new(&subject_dir, &template_dir, root.join("html"));

    let mut stub = Counter { calls: 0, fail_at: None };
    let out = generate_report(&request, &mut stub).unwrap();
    assert_eq!(stub.calls, 6);

    let names: Vec<_> = out
        .figures
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["sst_seg.svg", "sst_reg.svg", "ses-01_seg.svg", "ses-01_reg.svg", "ses-02_seg.svg", "ses-02_reg.svg"]
    );
    assert!(out.figures.iter().all(|p| p.is_file()));
    assert_eq!(out.html, root.join("html").join("sub-01.html"));

    let html = std::fs::read_to_string(&out.html).unwrap();
    assert_eq!(html.matches("class=\"reportlet\"").count(), 6);
    assert!(html.contains(r#"data="./sub-01/figures/sst_seg.svg""#));
}

#[test]
fn failure_aborts_without_page() {
    let root = temp_dir("pipeline_fail");
    let (subject_dir, template_dir) = subject_tree(&root, &["ses-01"]);
    let request = ReportRequest::new(&subject_dir, &template_dir, root.join("html"));

    let mut stub = Counter { calls: 0, fail_at: Some(2) };
    let err = generate_report(&request, &mut stub).unwrap_err();
    assert!(matches!(err, QcError::Render(_)));
    assert_eq!(stub.calls, 3);
    assert!(!root.join("html").join("sub-01.html").exists());
    // Scratch label volumes from the failed segmentation figure are gone.
    let visit = subject_dir.join("sub-01_ses-01_T1w_0");
    let leftovers: Vec<_> = std::fs::read_dir(&visit)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("_seg"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_input_volume_aborts() {
    let root = temp_dir("pipeline_missing");
    let (subject_dir, template_dir) = subject_tree(&root, &[]);
    std::fs::remove_file(template_dir.join("template_brain.nii.gz")).unwrap();
    let request = ReportRequest::new(&subject_dir, &template_dir, root.join("html"));

    let err = generate_report(&request, Counter { calls: 0, fail_at: None }).unwrap_err();
    assert!(matches!(err, QcError::FileNotFound(_)));
    assert!(!root.join("html").join("sub-01.html").exists());
}

#[test]
fn out_dir_without_subject_component_fails_before_drawing() {
    let root = temp_dir("pipeline_outdir");
    let (subject_dir, template_dir) = subject_tree(&root, &[]);
    let mut request = ReportRequest::new(&subject_dir, &template_dir, root.join("html"));
    request.out_dir = Some(root.join("elsewhere"));

    let mut stub = Counter { calls: 0, fail_at: None };
    let err = generate_report(&request, &mut stub).unwrap_err();
    assert!(matches!(err, QcError::PatternMismatch { .. }));
    assert_eq!(stub.calls, 0);
}
