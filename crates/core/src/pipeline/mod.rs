pub mod acquisition;
pub mod detection_loop;
pub mod events;
pub mod preview;
pub mod supervisor;
