use ndarray::Array3;
use nifti::NiftiType;

use super::*;

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

fn six_class_labels() -> Array3<f32> {
    Array3::from_shape_fn((6, 5, 4), |(x, y, z)| ((x + 2 * y + 3 * z) % 7) as f32)
}

#[test]
fn label_file_path_replaces_nifti_suffix() {
    let p = Path::new("/out/sst/T_templateBrainSegmentation.nii.gz");
    assert_eq!(
        label_file_path(p, TissueLabel::CorticalGm),
        Path::new("/out/sst/T_templateBrainSegmentation_seg2.nii.gz")
    );
    assert_eq!(
        label_file_path(Path::new("a/seg.nii"), TissueLabel::DeepGm),
        Path::new("a/seg_seg4.nii")
    );
}

#[test]
fn split_outputs_are_disjoint_and_reconstruct_requested_labels() {
    let labels = six_class_labels();
    let set = LabelSet::new(&[1, 3, 6]).unwrap();
    let parts = split_labels(&labels, &set);
    assert_eq!(parts.len(), 3);

    for ((x, y, z), &v) in labels.indexed_iter() {
        let hits: Vec<f32> = parts
            .iter()
            .map(|(_, a)| a[(x, y, z)])
            .filter(|p| *p != 0.0)
            .collect();
        if [1.0, 3.0, 6.0].contains(&v) {
            assert_eq!(hits, vec![v]);
        } else {
            assert!(hits.is_empty(), "unrequested label {v} leaked");
        }
    }
}

#[test]
fn split_segmentation_writes_files_with_reference_geometry() {
    let dir = temp_dir("split_write");
    let seg_path = dir.join("sub-01_ses-01_T1wBrainSegmentation.nii.gz");
    Volume::write_new(&seg_path, six_class_labels(), [1.0, 1.0, 2.0], NiftiType::Uint8).unwrap();

    let files = split_segmentation(&seg_path, &LabelSet::default()).unwrap();
    assert_eq!(
        files.paths(),
        &[
            dir.join("sub-01_ses-01_T1wBrainSegmentation_seg2.nii.gz"),
            dir.join("sub-01_ses-01_T1wBrainSegmentation_seg4.nii.gz"),
        ]
    );

    let gm = Volume::open(&files.paths()[0]).unwrap();
    assert_eq!(gm.shape(), [6, 5, 4]);
    assert_eq!(gm.voxel_sizes(), [1.0, 1.0, 2.0]);
    assert!(gm.data().iter().all(|v| *v == 0.0 || *v == 2.0));
    assert_eq!(gm.header().data_type().unwrap(), NiftiType::Uint8);
}

#[test]
fn scratch_files_are_removed_on_drop_unless_kept() {
    let dir = temp_dir("split_drop");
    let seg_path = dir.join("seg.nii.gz");
    Volume::write_new(&seg_path, six_class_labels(), [1.0; 3], NiftiType::Uint8).unwrap();

    let files = split_segmentation(&seg_path, &LabelSet::default()).unwrap();
    let paths = files.paths().to_vec();
    assert!(paths.iter().all(|p| p.exists()));
    drop(files);
    assert!(paths.iter().all(|p| !p.exists()));

    let kept = split_segmentation(&seg_path, &LabelSet::default())
        .unwrap()
        .keep();
    assert!(kept.iter().all(|p| p.exists()));
}

#[test]
fn invalid_labels_fail_before_anything_is_written() {
    let dir = temp_dir("split_invalid");
    let seg_path = dir.join("seg.nii.gz");
    Volume::write_new(&seg_path, six_class_labels(), [1.0; 3], NiftiType::Uint8).unwrap();

    let err = LabelSet::new(&[2, 7]).unwrap_err();
    assert!(matches!(err, QcError::InvalidArgument(_)));
    assert!(!dir.join("seg_seg2.nii.gz").exists());
}

#[test]
fn missing_segmentation_is_file_not_found() {
    let dir = temp_dir("split_missing");
    let err = split_segmentation(&dir.join("nope.nii.gz"), &LabelSet::default()).unwrap_err();
    assert!(matches!(err, QcError::FileNotFound(_)));
}
