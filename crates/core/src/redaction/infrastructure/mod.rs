pub mod pixelate_redactor;
