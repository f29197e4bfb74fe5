pub(crate) mod glam_ext;
