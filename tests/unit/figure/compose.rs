use ndarray::Array3;
use nifti::NiftiType;

use super::*;
use crate::figure::backend::FigureView;

fn temp_dir(name: &str) -> std::path::PathBuf {
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

#[derive(Default)]
struct Recorder {
    views: Vec<FigureView>,
    fail: bool,
}

impl Compositor for Recorder {
    fn compose(&mut self, view: &FigureView) -> QcResult<String> {
        self.views.push(view.clone());
        if self.fail {
            return Err(QcError::render("stub failure"));
        }
        Ok(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#.to_string())
    }
}

struct Inputs {
    anat: PathBuf,
    mask: PathBuf,
    seg: PathBuf,
}

fn write_inputs(dir: &Path) -> Inputs {
    let n = 12;
    let inside = |v: usize| (3..9).contains(&v);
    let mask = Array3::from_shape_fn((n, n, n), |(x, y, z)| {
        if inside(x) && inside(y) && inside(z) { 1.0 } else { 0.0 }
    });
    let seg = Array3::from_shape_fn((n, n, n), |(x, y, z)| {
        if inside(x) && inside(y) && inside(z) { (1 + (x + y + z) % 6) as f32 } else { 0.0 }
    });
    let anat = Array3::from_shape_fn((n, n, n), |(x, y, z)| (x * y + z) as f32);

    let inputs = Inputs {
        anat: dir.join("anat.nii.gz"),
        mask: dir.join("anatBrainExtractionMask.nii.gz"),
        seg: dir.join("anatBrainSegmentation.nii.gz"),
    };
    Volume::write_new(&inputs.anat, anat, [1.0; 3], NiftiType::Float32).unwrap();
    Volume::write_new(&inputs.mask, mask, [1.0; 3], NiftiType::Uint8).unwrap();
    Volume::write_new(&inputs.seg, seg, [1.0; 3], NiftiType::Uint8).unwrap();
    inputs
}

fn layer_names(view: &FigureView) -> Vec<String> {
    view.panels[0].layers.iter().map(|l| l.name.clone()).collect()
}

#[test]
fn svg_suffix_is_enforced() {
    assert_eq!(svg_path(Path::new("figs/sst_seg")), Path::new("figs/sst_seg.svg"));
    assert_eq!(svg_path(Path::new("figs/sst_seg.svg")), Path::new("figs/sst_seg.svg"));
    assert_eq!(svg_path(Path::new("a.png")), Path::new("a.png.svg"));
}

#[test]
fn segmentation_figure_orders_mask_then_labels_and_cleans_up() {
    let dir = temp_dir("compose_seg");
    let inputs = write_inputs(&dir);
    let mut composer = FigureComposer::new(Recorder::default());

    let out = composer
        .segmentation_figure(&inputs.anat, &inputs.seg, &inputs.mask, &dir.join("figures/sst_seg"))
        .unwrap();
    assert_eq!(out, dir.join("figures/sst_seg.svg"));
    assert!(out.exists());

    let view = &composer.compositor().views[0];
    assert_eq!(layer_names(view), vec!["mask", "seg2", "seg4"]);
    let titles: Vec<_> = view.panels[0].layers.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["brain mask", "cortical GM", "deep GM"]);
    let panel = &view.panels[0];
    assert_eq!(panel.brightness, Brightness::Full);
    assert_eq!(
        panel.crop,
        Some(VoxelBox {
            min: [3, 3, 3],
            max: [8, 8, 8]
        })
    );
    assert_eq!(panel.cuts.per_axis(), DEFAULT_CUTS);

    assert!(!dir.join("anatBrainSegmentation_seg2.nii.gz").exists());
    assert!(!dir.join("anatBrainSegmentation_seg4.nii.gz").exists());
}

#[test]
fn segmentation_figure_can_leave_out_the_mask() {
    let dir = temp_dir("compose_seg_nomask");
    let inputs = write_inputs(&dir);
    let opts = FigureOptions {
        labels: LabelSet::new(&[3]).unwrap(),
        segmentation_includes_mask: false,
        ..FigureOptions::default()
    };
    let mut composer = FigureComposer::with_options(Recorder::default(), opts.clone());
    assert_eq!(composer.options(), &opts);
    composer
        .segmentation_figure(&inputs.anat, &inputs.seg, &inputs.mask, &dir.join("seg.svg"))
        .unwrap();

    let recorder = composer.into_compositor();
    assert_eq!(layer_names(&recorder.views[0]), vec!["seg3"]);
    assert_eq!(recorder.views[0].panels[0].layers[0].title, "WM");
}

#[test]
fn scratch_files_are_removed_when_composition_fails() {
    let dir = temp_dir("compose_seg_fail");
    let inputs = write_inputs(&dir);
    let mut composer = FigureComposer::new(Recorder {
        fail: true,
        ..Recorder::default()
    });
    let err = composer
        .segmentation_figure(&inputs.anat, &inputs.seg, &inputs.mask, &dir.join("seg"))
        .unwrap_err();
    assert!(matches!(err, QcError::Render(_)));
    assert!(!dir.join("anatBrainSegmentation_seg2.nii.gz").exists());
    assert!(!dir.join("seg.svg").exists());
}

#[test]
fn brain_mask_figure_has_a_single_mask_layer() {
    let dir = temp_dir("compose_brain");
    let inputs = write_inputs(&dir);
    let mut composer = FigureComposer::new(Recorder::default());
    composer
        .brain_mask_figure(&inputs.anat, &inputs.mask, &dir.join("brain"))
        .unwrap();
    let view = &composer.compositor().views[0];
    assert_eq!(layer_names(view), vec!["mask"]);
    assert!(view.panels[0].crop.is_some());
}

#[test]
fn registration_figure_pairs_fixed_and_moving() {
    let dir = temp_dir("compose_reg");
    let inputs = write_inputs(&dir);
    let mut composer = FigureComposer::new(Recorder::default());
    composer
        .registration_figure(&inputs.anat, &inputs.anat, &inputs.mask, &dir.join("reg"))
        .unwrap();

    let view = &composer.compositor().views[0];
    let labels: Vec<_> = view.panels.iter().map(|p| p.label.clone().unwrap()).collect();
    assert_eq!(labels, vec!["fixed", "moving"]);
    for p in &view.panels {
        assert_eq!(p.brightness, Brightness::Estimate);
        assert!(p.layers.is_empty());
        assert!(p.crop.is_none());
        assert_eq!(p.cuts.along(crate::foundation::core::ViewAxis::Axial).len(), 7);
    }
    assert_eq!(view.panels[0].cuts, view.panels[1].cuts);
}

#[test]
fn missing_input_fails_without_writing() {
    let dir = temp_dir("compose_missing");
    let inputs = write_inputs(&dir);
    let mut composer = FigureComposer::new(Recorder::default());
    let err = composer
        .registration_figure(&dir.join("nope.nii.gz"), &inputs.anat, &inputs.mask, &dir.join("reg"))
        .unwrap_err();
    assert!(matches!(err, QcError::FileNotFound(_)));
    assert!(composer.compositor().views.is_empty());
    assert!(!dir.join("reg.svg").exists());
}

#[test]
fn zero_cuts_is_rejected_up_front() {
    let dir = temp_dir("compose_zero_cuts");
    let opts = FigureOptions {
        cuts: 0,
        ..FigureOptions::default()
    };
    let mut composer = FigureComposer::with_options(Recorder::default(), opts);
    let err = composer
        .brain_mask_figure(&dir.join("a.nii.gz"), &dir.join("m.nii.gz"), &dir.join("b"))
        .unwrap_err();
    assert!(matches!(err, QcError::InvalidArgument(_)));
}
