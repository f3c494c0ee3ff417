mod user_dto;

pub use user_dto::{
    AuthResponseDto, LoginDto, RegisterUserDto, UpdateUserDto, UserResponseDto,
};
