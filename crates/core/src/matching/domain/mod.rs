pub mod face_cropper;
pub mod reference_set;
pub mod similarity;
