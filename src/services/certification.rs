use chrono::Utc;
use uuid::Uuid;

use crate::{
    documents::CertificateDocument,
    errors::{AssetError, ServiceError},
    models::{
        certificate::{Certificate, CertificateTemplate, NewCertificate, NewTemplate},
        constraint,
        user::User,
    },
    schema::certificate::{CertificateVerification, IssueCertificate, TemplateUpload},
    services::commerce,
    storage::UploadPolicy,
    utils::new_certificate_code,
    GlobalState,
};

const CODE_ATTEMPTS: usize = 5;

async fn unused_code(state: &GlobalState) -> Result<String, ServiceError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = new_certificate_code();
        if state.store.find_certificate_by_code(&code).await?.is_none() {
            return Ok(code);
        }
        tracing::warn!(%code, "certificate code collision, rolling again");
    }
    Err(ServiceError::Internal("could not generate a unique certificate code".to_string()))
}

/// Issues the certificate of a student for a course.
///
/// Eligibility is a validated purchase; module completion is not checked.
/// The rendered document is stored before the row and removed again if the
/// row cannot be written.
pub async fn issue(state: &GlobalState, request: IssueCertificate) -> Result<Certificate, ServiceError> {
    let student = state.store.find_user(request.student_id).await?.ok_or(ServiceError::NotFound)?;
    let course = state.store.find_course(request.course_id).await?.ok_or(ServiceError::NotFound)?;

    if state.store.find_certificate_for(student.id, course.id).await?.is_some() {
        return Err(ServiceError::DuplicateCertificate);
    }
    if !commerce::has_access(state, student.id, course.id).await? {
        return Err(ServiceError::Validation(
            "The student has no validated purchase for this course.".to_string(),
        ));
    }

    let template = match request.template_id {
        Some(id) => Some(state.store.find_template(id).await?.ok_or(ServiceError::NotFound)?),
        None => None,
    };

    let code = unused_code(state).await?;
    let issued_on = Utc::now().date_naive();

    let bytes = state.renderer.render_certificate(&CertificateDocument {
        code: code.clone(),
        student_name: student.full_name.clone(),
        course_title: course.title.clone(),
        issued_on,
        template_name: template.map(|t| t.name),
    })?;

    let document_path = format!("certificates/issued/{code}.pdf");
    state.assets.save(&document_path, &bytes).await?;

    let created = state
        .store
        .create_certificate(NewCertificate {
            student_id: student.id,
            course_id: course.id,
            issued_on,
            code,
            document_path: document_path.clone(),
        })
        .await;

    match created {
        Ok(certificate) => {
            tracing::info!(certificate_id = certificate.id, code = %certificate.code, student_id = student.id, course_id = course.id, "certificate issued");
            Ok(certificate)
        }
        Err(e) => {
            if let Err(asset_err) = state.assets.remove(&document_path).await {
                tracing::warn!(path = %document_path, error = %asset_err, "orphaned certificate document");
            }
            if e.violates(constraint::CERTIFICATES_STUDENT_COURSE) {
                return Err(ServiceError::DuplicateCertificate);
            }
            Err(e.into())
        }
    }
}

pub async fn all_certificates(state: &GlobalState) -> Result<Vec<Certificate>, ServiceError> {
    Ok(state.store.list_certificates(None).await?)
}

pub async fn student_certificates(state: &GlobalState, student: &User) -> Result<Vec<Certificate>, ServiceError> {
    Ok(state.store.list_certificates(Some(student.id)).await?)
}

/// The stored document of one of the student's own certificates.
pub async fn certificate_document(state: &GlobalState, student: &User, certificate_id: i64) -> Result<(Certificate, Vec<u8>), ServiceError> {
    let certificate = state
        .store
        .find_certificate(certificate_id)
        .await?
        .filter(|c| c.student_id == student.id)
        .ok_or(ServiceError::NotFound)?;

    let bytes = state.assets.read(&certificate.document_path).await?;
    Ok((certificate, bytes))
}

pub async fn verify(state: &GlobalState, code: &str) -> Result<CertificateVerification, ServiceError> {
    let certificate = state
        .store
        .find_certificate_by_code(code.trim())
        .await?
        .ok_or(ServiceError::NotFound)?;
    let student = state.store.find_user(certificate.student_id).await?.ok_or(ServiceError::NotFound)?;
    let course = state.store.find_course(certificate.course_id).await?.ok_or(ServiceError::NotFound)?;

    Ok(CertificateVerification {
        code: certificate.code,
        student_name: student.full_name,
        course_title: course.title,
        issued_on: certificate.issued_on,
    })
}

pub async fn list_templates(state: &GlobalState) -> Result<Vec<CertificateTemplate>, ServiceError> {
    Ok(state.store.list_templates().await?)
}

pub async fn upload_template(
    state: &GlobalState,
    upload: TemplateUpload,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<CertificateTemplate, ServiceError> {
    let name = upload.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("The field `name` is required.".to_string()));
    }
    UploadPolicy::PDF_ONLY.check(content_type, bytes)?;

    let file_path = format!("certificates/templates/{}.pdf", Uuid::new_v4().simple());
    state.assets.save(&file_path, bytes).await?;

    let created = state
        .store
        .create_template(NewTemplate {
            name: name.to_string(),
            description: upload.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            file_path: file_path.clone(),
        })
        .await;

    match created {
        Ok(template) => {
            tracing::info!(template_id = template.id, path = %template.file_path, "certificate template uploaded");
            Ok(template)
        }
        Err(e) => {
            if let Err(asset_err) = state.assets.remove(&file_path).await {
                tracing::warn!(path = %file_path, error = %asset_err, "orphaned template document");
            }
            Err(e.into())
        }
    }
}

/// Deletes the row, then the asset. If the asset cannot be removed the row is
/// put back, so neither side is left without the other.
pub async fn delete_template(state: &GlobalState, template_id: i64) -> Result<(), ServiceError> {
    let template = state.store.find_template(template_id).await?.ok_or(ServiceError::NotFound)?;

    state.store.delete_template(template.id).await?;

    match state.assets.remove(&template.file_path).await {
        Ok(()) => {}
        Err(AssetError::NotFound(path)) => {
            tracing::warn!(%path, template_id, "template asset was already missing");
        }
        Err(e) => {
            tracing::error!(template_id, error = %e, "template asset removal failed, restoring row");
            state.store.restore_template(&template).await?;
            return Err(e.into());
        }
    }

    tracing::info!(template_id, "certificate template deleted");
    Ok(())
}
