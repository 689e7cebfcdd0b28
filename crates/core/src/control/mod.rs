pub mod face_controller;
