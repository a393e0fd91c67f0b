pub mod ch8;
