//! User-facing text. The interface is French; log messages stay English.

pub const APP_TITLE: &str = "Chat Issam";

pub const NAV_CHAT: &str = "Chat";
pub const NAV_PHOTO_EDITOR: &str = "Éditeur Photo";

pub const GREETING: &str =
    "Bonjour! Je suis Issam, votre assistant IA. Comment puis-je vous aider aujourd'hui?";
pub const CHAT_PLACEHOLDER: &str = "Posez votre question à Issam...";
pub const STREAM_FAILURE: &str = "Désolé, une erreur s'est produite. Veuillez réessayer.";

pub const MISSING_KEY_TITLE: &str = "Clé API manquante";
pub const MISSING_KEY_BODY: &str = "La variable d'environnement `GEMINI_API_KEY` (ou `API_KEY`) n'est pas configurée. \
Veuillez la définir pour utiliser l'application.";

pub const IMAGE_EDIT_FAILURE: &str =
    "Une erreur s'est produite lors de la communication avec l'API Gemini.";
pub const NO_IMAGE_RETURNED: &str = "L'API n'a pas retourné d'image modifiée.";
pub const CONVERSION_FAILURE: &str = "Échec de la conversion du fichier en base64.";
pub const READ_FAILURE: &str = "Impossible de lire le fichier sélectionné.";

pub const PHOTO_PATH_LABEL: &str = "Image";
pub const PHOTO_PATH_PLACEHOLDER: &str = "Chemin du fichier image (png, jpg, webp)...";
pub const PHOTO_PROMPT_LABEL: &str = "Instruction";
pub const PHOTO_PROMPT_PLACEHOLDER: &str = "Décrivez la modification souhaitée...";
pub const PHOTO_EMPTY_RESULT: &str = "Le résultat de l'édition apparaîtra ici.";
pub const PHOTO_SAVED_TO: &str = "Image modifiée enregistrée dans";

pub const LOADING: &str = "Chargement";
