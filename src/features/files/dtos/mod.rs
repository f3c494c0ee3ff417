mod file_dto;

pub use file_dto::{
    counter_column_for_mime, parse_expiry_spec, DownloadBody, DownloadCountDto, DownloadQuery,
    EmailShareDto, FileDetailsDto, SearchQuery, ShareLinkDto, SharedFileDto, UpdateExpiryDto,
    UpdatePasswordDto, UpdateStatusDto, UploadFormDto, UploadOptions, UploadResponseDto,
    UploadedFile, VerifyPasswordDto,
};
