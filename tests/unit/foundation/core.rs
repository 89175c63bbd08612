use super::*;

#[test]
fn label_values_follow_pipeline_convention() {
    let values: Vec<u8> = TissueLabel::ALL.iter().map(|l| l.value()).collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(TissueLabel::try_from(2).unwrap(), TissueLabel::CorticalGm);
    assert_eq!(TissueLabel::try_from(4).unwrap(), TissueLabel::DeepGm);
    assert!(TissueLabel::try_from(0).is_err());
    assert!(TissueLabel::try_from(7).is_err());
}

#[test]
fn default_label_set_is_cortical_and_deep_gm() {
    assert_eq!(LabelSet::default().values(), vec![2, 4]);
}

#[test]
fn label_set_rejects_whole_request_on_any_bad_label() {
    let err = LabelSet::new(&[2, 9, 4, 0]).unwrap_err();
    assert!(matches!(err, QcError::InvalidArgument(_)));
    let msg = err.to_string();
    assert!(msg.contains('9'));
    assert!(msg.contains('0'));
}

#[test]
fn label_set_keeps_order_and_drops_duplicates() {
    let set = LabelSet::new(&[4, 2, 4, 1]).unwrap();
    assert_eq!(set.values(), vec![4, 2, 1]);
    assert_eq!(set.len(), 3);
}

#[test]
fn labels_deserialize_through_validation() {
    let ok: Vec<TissueLabel> = serde_json::from_str("[1, 6]").unwrap();
    assert_eq!(ok, vec![TissueLabel::Csf, TissueLabel::Cerebellum]);
    assert!(serde_json::from_str::<Vec<TissueLabel>>("[7]").is_err());
}

#[test]
fn view_axes_cover_the_two_other_dimensions() {
    for axis in ViewAxis::ALL {
        let (h, v) = axis.plane_axes();
        assert_ne!(h, axis.index());
        assert_ne!(v, axis.index());
        assert_ne!(h, v);
    }
}
